use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A user's access window to a course. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub course_id: ObjectId,
    pub access_start_at: DateTime,
    pub access_end_at: DateTime,
    pub source: GrantSource,
    /// Redeemed code, for `GrantSource::Code` grants.
    pub code_id: Option<ObjectId>,
    /// Issuing admin, for `GrantSource::Manual` grants.
    pub granted_by: Option<ObjectId>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    Code,
    Manual,
}

impl AccessGrant {
    pub const COLLECTION: &'static str = "access_grants";

    pub fn is_active_at(&self, now: DateTime) -> bool {
        self.access_end_at > now
    }
}
