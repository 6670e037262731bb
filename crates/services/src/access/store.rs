use std::collections::HashMap;

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use coursegate_db::models::{AccessCode, AccessGrant};
use mongodb::Database;

use crate::dao::{
    access_code::{AccessCodeDao, CodeFilter},
    access_grant::AccessGrantDao,
    base::DaoResult,
    course::CourseDao,
    user::{UserDao, UserSummary},
};

/// Storage boundary of the access service.
///
/// Implementations must make `insert_code` fail with `DaoError::DuplicateKey`
/// on a taken code string and make `claim_code` a compare-and-set on
/// `is_used`.
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn course_exists(&self, course_id: ObjectId) -> DaoResult<bool>;
    async fn user_exists(&self, user_id: ObjectId) -> DaoResult<bool>;
    async fn course_titles(&self, ids: &[ObjectId]) -> DaoResult<HashMap<ObjectId, String>>;
    async fn user_summaries(&self, ids: &[ObjectId])
    -> DaoResult<HashMap<ObjectId, UserSummary>>;

    async fn code_exists(&self, code: &str) -> DaoResult<bool>;
    async fn insert_code(&self, code: &AccessCode) -> DaoResult<AccessCode>;
    async fn find_redeemable_code(&self, code: &str, now: DateTime)
    -> DaoResult<Option<AccessCode>>;
    /// Marks the code used by `user_id` if it is still unused.
    async fn claim_code(&self, code_id: ObjectId, user_id: ObjectId, now: DateTime)
    -> DaoResult<bool>;
    /// Reverts a claim made by `user_id`.
    async fn release_code(&self, code_id: ObjectId, user_id: ObjectId) -> DaoResult<bool>;
    async fn list_codes(&self, filter: &CodeFilter) -> DaoResult<Vec<AccessCode>>;

    async fn insert_grant(&self, grant: &AccessGrant) -> DaoResult<AccessGrant>;
    async fn find_grant_by_code(&self, code_id: ObjectId) -> DaoResult<Option<AccessGrant>>;
    async fn latest_active_grant(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<Option<AccessGrant>>;
    async fn list_user_grants(&self, user_id: ObjectId) -> DaoResult<Vec<AccessGrant>>;
}

pub struct MongoAccessStore {
    codes: AccessCodeDao,
    grants: AccessGrantDao,
    courses: CourseDao,
    users: UserDao,
}

impl MongoAccessStore {
    pub fn new(db: &Database) -> Self {
        Self {
            codes: AccessCodeDao::new(db),
            grants: AccessGrantDao::new(db),
            courses: CourseDao::new(db),
            users: UserDao::new(db),
        }
    }
}

#[async_trait]
impl AccessStore for MongoAccessStore {
    async fn course_exists(&self, course_id: ObjectId) -> DaoResult<bool> {
        self.courses.exists(course_id).await
    }

    async fn user_exists(&self, user_id: ObjectId) -> DaoResult<bool> {
        self.users.exists(user_id).await
    }

    async fn course_titles(&self, ids: &[ObjectId]) -> DaoResult<HashMap<ObjectId, String>> {
        self.courses.titles(ids).await
    }

    async fn user_summaries(
        &self,
        ids: &[ObjectId],
    ) -> DaoResult<HashMap<ObjectId, UserSummary>> {
        self.users.summaries(ids).await
    }

    async fn code_exists(&self, code: &str) -> DaoResult<bool> {
        self.codes.code_exists(code).await
    }

    async fn insert_code(&self, code: &AccessCode) -> DaoResult<AccessCode> {
        self.codes.insert(code).await
    }

    async fn find_redeemable_code(
        &self,
        code: &str,
        now: DateTime,
    ) -> DaoResult<Option<AccessCode>> {
        self.codes.find_redeemable(code, now).await
    }

    async fn claim_code(
        &self,
        code_id: ObjectId,
        user_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<bool> {
        self.codes.claim(code_id, user_id, now).await
    }

    async fn release_code(&self, code_id: ObjectId, user_id: ObjectId) -> DaoResult<bool> {
        self.codes.release(code_id, user_id).await
    }

    async fn list_codes(&self, filter: &CodeFilter) -> DaoResult<Vec<AccessCode>> {
        self.codes.list(filter).await
    }

    async fn insert_grant(&self, grant: &AccessGrant) -> DaoResult<AccessGrant> {
        self.grants.insert(grant).await
    }

    async fn find_grant_by_code(&self, code_id: ObjectId) -> DaoResult<Option<AccessGrant>> {
        self.grants.find_by_code(code_id).await
    }

    async fn latest_active_grant(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<Option<AccessGrant>> {
        self.grants.latest_active(user_id, course_id, now).await
    }

    async fn list_user_grants(&self, user_id: ObjectId) -> DaoResult<Vec<AccessGrant>> {
        self.grants.list_for_user(user_id).await
    }
}
