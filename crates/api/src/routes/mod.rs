pub mod access;
pub mod auth;
pub mod course;

use bson::oid::ObjectId;

use crate::error::ApiError;

pub(crate) fn parse_object_id(raw: &str, field: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}
