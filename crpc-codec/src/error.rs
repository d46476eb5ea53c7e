use std::fmt;
use std::io;

/// Errors produced while framing, serializing or compressing a message.
/// Every variant is either a protocol error (bad magic/version/length/
/// enumerant) or a codec error (serialize/deserialize/compress/uncompress
/// failure).
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// Short read on the 17-byte header or the declared body.
    Truncated,
    MagicMismatch { expected: u8, actual: u8 },
    VersionMismatch { expected: u8, actual: u8 },
    UnknownMessageType(u8),
    UnknownSerializer(u8),
    UnknownCompressor(u8),
    /// A declared `fullLength` smaller than the fixed header size.
    InvalidLength(u32),
    /// Wraps a bincode/serde_json/gzip failure with its message.
    Codec(String),
    /// A `DynamicValue` could not be coerced to the shape a method expected.
    Coercion(String),
    /// A frame's `messageType` didn't match what the caller asked to decode.
    UnexpectedMessageType { wanted: &'static str, got: u8 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Truncated => write!(f, "truncated frame"),
            Error::MagicMismatch { expected, actual } => {
                write!(f, "bad magic number: expected {:#x}, got {:#x}", expected, actual)
            }
            Error::VersionMismatch { expected, actual } => {
                write!(f, "bad version: expected {:#x}, got {:#x}", expected, actual)
            }
            Error::UnknownMessageType(b) => write!(f, "unknown message type {}", b),
            Error::UnknownSerializer(b) => write!(f, "unknown serializer type {}", b),
            Error::UnknownCompressor(b) => write!(f, "unknown compressor type {}", b),
            Error::InvalidLength(n) => write!(f, "full length {} is smaller than the header", n),
            Error::Codec(msg) => write!(f, "codec error: {}", msg),
            Error::Coercion(msg) => write!(f, "coercion error: {}", msg),
            Error::UnexpectedMessageType { wanted, got } => {
                write!(f, "expected a {} frame, got message type {}", wanted, got)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
