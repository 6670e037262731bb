use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use coursegate_db::models::AccessGrant;

use super::base::{BaseDao, DaoResult};

pub struct AccessGrantDao {
    pub base: BaseDao<AccessGrant>,
}

impl AccessGrantDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, AccessGrant::COLLECTION),
        }
    }

    pub async fn insert(&self, grant: &AccessGrant) -> DaoResult<AccessGrant> {
        let id = self.base.insert_one(grant).await?;
        let mut stored = grant.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    pub async fn find_by_code(&self, code_id: ObjectId) -> DaoResult<Option<AccessGrant>> {
        self.base.find_one(doc! { "code_id": code_id }).await
    }

    /// Grant with the furthest `access_end_at` still in the future at `now`.
    pub async fn latest_active(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<Option<AccessGrant>> {
        Ok(self
            .base
            .collection()
            .find_one(doc! {
                "user_id": user_id,
                "course_id": course_id,
                "access_end_at": { "$gt": now },
            })
            .sort(doc! { "access_end_at": -1 })
            .await?)
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<AccessGrant>> {
        self.base
            .find_many(
                doc! { "user_id": user_id },
                Some(doc! { "access_end_at": -1, "_id": -1 }),
            )
            .await
    }
}
