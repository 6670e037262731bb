use thiserror::Error;

use crate::dao::base::DaoError;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Course not found")]
    CourseNotFound,
    #[error("User not found")]
    UserNotFound,
    /// Unknown, already used, or past its own expiry.
    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("This code belongs to a different course")]
    CodeCourseMismatch,
    #[error("The access window for this code has ended")]
    WindowExpired,
    #[error("Could not generate a unique code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error(transparent)]
    Store(#[from] DaoError),
}

pub type AccessResult<T> = Result<T, AccessError>;
