use std::collections::HashMap;

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use coursegate_db::models::Course;

use super::base::{BaseDao, DaoResult};

pub struct CourseDao {
    pub base: BaseDao<Course>,
}

impl CourseDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Course::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        title: String,
        description: Option<String>,
        created_by: ObjectId,
    ) -> DaoResult<Course> {
        let now = DateTime::now();
        let mut course = Course {
            id: None,
            title,
            description,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&course).await?;
        course.id = Some(id);
        Ok(course)
    }

    pub async fn list(&self) -> DaoResult<Vec<Course>> {
        self.base
            .find_many(doc! {}, Some(doc! { "created_at": -1, "_id": -1 }))
            .await
    }

    pub async fn exists(&self, course_id: ObjectId) -> DaoResult<bool> {
        Ok(self.base.count(doc! { "_id": course_id }).await? > 0)
    }

    pub async fn titles(&self, ids: &[ObjectId]) -> DaoResult<HashMap<ObjectId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let courses = self
            .base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;

        Ok(courses
            .into_iter()
            .filter_map(|c| c.id.map(|id| (id, c.title)))
            .collect())
    }
}
