use std::fmt;
use std::io;

/// Transport/codec/remote failure kinds for the RPC client. Every
/// variant here is a "failure" for circuit-breaker purposes unless the
/// caller supplies its own `is_success`.
#[derive(Debug)]
pub enum Error {
    Connect(io::Error),
    Write(io::Error),
    /// The receive task's read did not complete within the per-call
    /// deadline.
    ReadTimeout,
    /// A read failed for a reason other than the deadline (connection
    /// reset, truncated frame, etc).
    Read(String),
    Codec(crpc_codec::Error),
    /// The remote side answered with `code != 200`.
    Remote { code: i16, msg: String },
    /// A response arrived whose `requestId` didn't match the request
    /// that was sent on this connection.
    RequestIdMismatch { expected: u64, actual: u64 },
    /// `ClientProxy::call` exhausted its retry budget; wraps the last
    /// attempt's error message.
    RetryExhausted(String),
    /// Refused by a `crpc_breaker::CircuitBreaker` wrapping the call.
    Breaker(crpc_breaker::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connect(e) => write!(f, "connect error: {}", e),
            Error::Write(e) => write!(f, "write error: {}", e),
            Error::ReadTimeout => write!(f, "read timed out"),
            Error::Read(msg) => write!(f, "read error: {}", msg),
            Error::Codec(e) => write!(f, "codec error: {}", e),
            Error::Remote { code, msg } => write!(f, "remote error [{}]: {}", code, msg),
            Error::RequestIdMismatch { expected, actual } => {
                write!(f, "response request id {} does not match request id {}", actual, expected)
            }
            Error::RetryExhausted(last) => write!(f, "retries exhausted, last error: {}", last),
            Error::Breaker(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<crpc_codec::Error> for Error {
    fn from(e: crpc_codec::Error) -> Self {
        Error::Codec(e)
    }
}

impl From<crpc_breaker::Error> for Error {
    fn from(e: crpc_breaker::Error) -> Self {
        Error::Breaker(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
