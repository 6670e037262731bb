use std::collections::HashMap;

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use coursegate_db::models::{User, UserRole};
use tracing::info;

use super::base::{BaseDao, DaoError, DaoResult};

/// Display fields of a user, joined into admin listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub display_name: String,
    pub email: String,
}

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        display_name: String,
        password_hash: String,
        role: UserRole,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let mut user = User {
            id: None,
            email: email.trim().to_lowercase(),
            display_name,
            password_hash: Some(password_hash),
            role,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        user.id = Some(id);
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn exists(&self, user_id: ObjectId) -> DaoResult<bool> {
        Ok(self.base.count(doc! { "_id": user_id }).await? > 0)
    }

    pub async fn summaries(&self, ids: &[ObjectId]) -> DaoResult<HashMap<ObjectId, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self
            .base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;

        Ok(users
            .into_iter()
            .filter_map(|u| {
                u.id.map(|id| {
                    (
                        id,
                        UserSummary {
                            display_name: u.display_name,
                            email: u.email,
                        },
                    )
                })
            })
            .collect())
    }

    /// Creates the admin account unless a user with `email` already exists.
    /// An existing non-admin account with that email is promoted.
    pub async fn ensure_admin(
        &self,
        email: &str,
        display_name: &str,
        password_hash: String,
    ) -> DaoResult<User> {
        match self.find_by_email(email).await {
            Ok(mut user) => {
                if user.role != UserRole::Admin {
                    if let Some(id) = user.id {
                        self.base
                            .update_one(
                                doc! { "_id": id },
                                doc! { "$set": { "role": UserRole::Admin.as_str() } },
                            )
                            .await?;
                    }
                    user.role = UserRole::Admin;
                    info!(%email, "Promoted existing user to admin");
                }
                Ok(user)
            }
            Err(DaoError::NotFound) => {
                let user = self
                    .create(
                        email.to_string(),
                        display_name.to_string(),
                        password_hash,
                        UserRole::Admin,
                    )
                    .await?;
                info!(%email, "Bootstrap admin created");
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }
}
