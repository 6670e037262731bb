use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use coursegate_db::models::AccessCode;

use super::base::{BaseDao, DaoResult};

/// Optional filters for the admin code listing.
#[derive(Debug, Clone, Default)]
pub struct CodeFilter {
    pub course_id: Option<ObjectId>,
    pub is_used: Option<bool>,
}

impl CodeFilter {
    fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(course_id) = self.course_id {
            filter.insert("course_id", course_id);
        }
        if let Some(is_used) = self.is_used {
            filter.insert("is_used", is_used);
        }
        filter
    }

    pub fn matches(&self, code: &AccessCode) -> bool {
        self.course_id.is_none_or(|id| code.course_id == id)
            && self.is_used.is_none_or(|used| code.is_used == used)
    }
}

pub struct AccessCodeDao {
    pub base: BaseDao<AccessCode>,
}

impl AccessCodeDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, AccessCode::COLLECTION),
        }
    }

    pub async fn code_exists(&self, code: &str) -> DaoResult<bool> {
        Ok(self.base.count(doc! { "code": code }).await? > 0)
    }

    pub async fn insert(&self, code: &AccessCode) -> DaoResult<AccessCode> {
        let id = self.base.insert_one(code).await?;
        let mut stored = code.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    pub async fn find_redeemable(&self, code: &str, now: DateTime) -> DaoResult<Option<AccessCode>> {
        self.base
            .find_one(doc! {
                "code": code,
                "is_used": false,
                "$or": [
                    { "code_expires_at": null },
                    { "code_expires_at": { "$gte": now } },
                ],
            })
            .await
    }

    /// Flips `is_used` only if it is still false. Exactly one concurrent
    /// caller observes `true` for a given code.
    pub async fn claim(&self, code_id: ObjectId, user_id: ObjectId, now: DateTime) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": code_id, "is_used": false },
                doc! {
                    "$set": {
                        "is_used": true,
                        "used_by": user_id,
                        "used_at": now,
                    }
                },
            )
            .await
    }

    /// Undoes a claim held by `user_id`.
    pub async fn release(&self, code_id: ObjectId, user_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": code_id, "is_used": true, "used_by": user_id },
                doc! {
                    "$set": {
                        "is_used": false,
                        "used_by": null,
                        "used_at": null,
                    }
                },
            )
            .await
    }

    pub async fn list(&self, filter: &CodeFilter) -> DaoResult<Vec<AccessCode>> {
        self.base
            .find_many(filter.to_document(), Some(doc! { "created_at": -1, "_id": -1 }))
            .await
    }
}
