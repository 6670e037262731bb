pub mod access;
pub mod auth;
pub mod dao;

pub use access::{AccessError, AccessService, MongoAccessStore};
pub use auth::AuthService;
pub use dao::*;
