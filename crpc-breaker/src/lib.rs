//! Three-state circuit breaker generalized from `breaker/breaker.go`.
//! Generic over the guarded operation's success type `T` and error type
//! `E: From<Error>` so callers can wrap any fallible call, not just RPC
//! invocations.

mod breaker;
mod counts;
mod error;
mod state;

pub use breaker::{CircuitBreaker, Settings};
pub use counts::Counts;
pub use error::{Error, Result};
pub use state::State;
