use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use coursegate_db::models::Course;
use coursegate_services::dao::base::DaoError;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_object_id;
use crate::{
    error::ApiError,
    extractors::auth::{AdminUser, AuthUser},
    extractors::json::ValidatedJson,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: course.title,
            description: course.description,
            created_at: course.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseList {
    pub courses: Vec<CourseResponse>,
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(body): ValidatedJson<CreateCourseRequest>,
) -> Result<ApiResponse<CourseResponse>, ApiError> {
    let title = body.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("title must not be blank".to_string()));
    }

    let course = state
        .courses
        .create(title, body.description, admin.user_id)
        .await?;

    tracing::info!(course_id = ?course.id, admin = %admin.user_id, "Course created");
    Ok(ApiResponse::created(course.into(), "Course created"))
}

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<ApiResponse<CourseList>, ApiError> {
    let courses = state.courses.list().await?;
    Ok(ApiResponse::ok(
        CourseList {
            courses: courses.into_iter().map(Into::into).collect(),
        },
        "Courses",
    ))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(course_id): Path<String>,
) -> Result<ApiResponse<CourseResponse>, ApiError> {
    let course_id = parse_object_id(&course_id, "courseId")?;
    let course = state
        .courses
        .base
        .find_by_id(course_id)
        .await
        .map_err(|e| match e {
            DaoError::NotFound => ApiError::NotFound("Course not found".to_string()),
            other => other.into(),
        })?;

    Ok(ApiResponse::ok(course.into(), "Course"))
}
