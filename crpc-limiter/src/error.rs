use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// Token acquisition did not succeed within the configured wait
    /// timeout.
    RateLimited,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RateLimited => write!(f, "rate limited"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
