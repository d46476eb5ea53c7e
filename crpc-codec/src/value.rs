//! The generic dynamic-value sum type carried by the `PROTOBUF` transport.

use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};

/// Null, bool, signed/unsigned 64-bit integers, doubles, UTF-8 strings,
/// ordered sequences and keyed mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Seq(Vec<DynamicValue>),
    /// Keyed mapping. Kept as an ordered `Vec` rather than a `HashMap` so
    /// that encoding is deterministic, which the frame round-trip tests
    /// in `frame.rs` rely on.
    Map(Vec<(String, DynamicValue)>),
}

impl DynamicValue {
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            DynamicValue::Bool(b) => Ok(*b),
            other => Err(Error::Coercion(format!("{:?} is not a bool", other))),
        }
    }

    /// Widens to `i64`. Both `Int` and in-range `UInt` are accepted:
    /// integers widen to the declared parameter's integer width, but
    /// floats never coerce from integers.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            DynamicValue::Int(i) => Ok(*i),
            DynamicValue::UInt(u) if *u <= i64::MAX as u64 => Ok(*u as i64),
            other => Err(Error::Coercion(format!("{:?} cannot widen to i64", other))),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self {
            DynamicValue::UInt(u) => Ok(*u),
            DynamicValue::Int(i) if *i >= 0 => Ok(*i as u64),
            other => Err(Error::Coercion(format!("{:?} cannot widen to u64", other))),
        }
    }

    /// "Doubles coerce to floats only" — an integer argument is never
    /// silently accepted where a float is declared.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            DynamicValue::Float(f) => Ok(*f),
            other => Err(Error::Coercion(format!("{:?} is not a float", other))),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            DynamicValue::String(s) => Ok(s.as_str()),
            other => Err(Error::Coercion(format!("{:?} is not a string", other))),
        }
    }

    pub fn as_seq(&self) -> Result<&[DynamicValue]> {
        match self {
            DynamicValue::Seq(s) => Ok(s.as_slice()),
            other => Err(Error::Coercion(format!("{:?} is not a sequence", other))),
        }
    }

    pub fn as_map(&self) -> Result<&[(String, DynamicValue)]> {
        match self {
            DynamicValue::Map(m) => Ok(m.as_slice()),
            other => Err(Error::Coercion(format!("{:?} is not a mapping", other))),
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}

impl From<i64> for DynamicValue {
    fn from(i: i64) -> Self {
        DynamicValue::Int(i)
    }
}

impl From<u64> for DynamicValue {
    fn from(u: u64) -> Self {
        DynamicValue::UInt(u)
    }
}

impl From<f64> for DynamicValue {
    fn from(f: f64) -> Self {
        DynamicValue::Float(f)
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl<'a> From<&'a str> for DynamicValue {
    fn from(s: &'a str) -> Self {
        DynamicValue::String(s.to_owned())
    }
}
