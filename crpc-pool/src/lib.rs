mod error;
mod pool;
mod worker;

pub use error::{Error, Result};
pub use pool::{Pool, DEFAULT_EXPIRE};
