use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// One-time code that grants its redeemer the stored access window.
///
/// Created unused in batches. Redemption flips `is_used` exactly once and
/// records `used_by`/`used_at`; documents are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCode {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    pub course_id: ObjectId,
    pub access_start_at: DateTime,
    pub access_end_at: DateTime,
    /// Last instant the code itself may be redeemed. Independent of the window.
    pub code_expires_at: Option<DateTime>,
    #[serde(default)]
    pub is_used: bool,
    pub used_by: Option<ObjectId>,
    pub used_at: Option<DateTime>,
    pub created_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl AccessCode {
    pub const COLLECTION: &'static str = "access_codes";

    /// Unused and not past its own expiry at `now` (expiry instant inclusive).
    pub fn is_redeemable_at(&self, now: DateTime) -> bool {
        !self.is_used && self.code_expires_at.is_none_or(|expires| expires >= now)
    }
}
