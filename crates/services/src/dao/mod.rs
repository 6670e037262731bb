pub mod access_code;
pub mod access_grant;
pub mod base;
pub mod course;
pub mod user;

pub use base::BaseDao;
