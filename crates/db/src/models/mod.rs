pub mod access_code;
pub mod access_grant;
pub mod course;
pub mod user;

pub use access_code::AccessCode;
pub use access_grant::{AccessGrant, GrantSource};
pub use course::Course;
pub use user::{User, UserRole};
