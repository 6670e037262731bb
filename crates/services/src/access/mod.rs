pub mod clock;
pub mod code_generator;
pub mod error;
pub mod service;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use code_generator::{CodeGenerator, RandomCodeGenerator, CODE_ALPHABET};
pub use error::{AccessError, AccessResult};
pub use service::{AccessCodeView, AccessGrantView, AccessService, AccessStatus, GenerateCodes};
pub use store::{AccessStore, MongoAccessStore};
