use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    InvalidCap,
    InvalidExpire,
    PoolReleased,
    /// The worker handed out by the acquisition algorithm disappeared
    /// (its receiver was dropped) before the task could be sent. This
    /// should not happen under normal operation; submit() treats it the
    /// same as a released pool rather than panicking the caller's thread.
    WorkerGone,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCap => write!(f, "pool cap can not <= 0"),
            Error::InvalidExpire => write!(f, "pool expire can not <= 0"),
            Error::PoolReleased => write!(f, "pool has been released"),
            Error::WorkerGone => write!(f, "acquired worker is no longer reachable"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
