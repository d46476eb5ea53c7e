//! Connection, framed send, framed receive with per-call timeout, and a
//! retry wrapper over `RpcClient`. The three-state circuit breaker that
//! typically wraps `ClientProxy::call` lives in the sibling `crpc-breaker`
//! crate.

mod client;
mod error;
mod proxy;

pub use client::RpcClient;
pub use error::{Error, Result};
pub use proxy::{ClientProxy, ClientProxyOptions};
