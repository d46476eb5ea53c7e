use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// Refused in `OPEN` state.
    BreakerOpen,
    /// Refused in `HALF_OPEN` state: `counts.Requests >= maxRequests`.
    TooManyProbes,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BreakerOpen => write!(f, "breaker has been opened"),
            Error::TooManyProbes => write!(f, "too many requests"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
