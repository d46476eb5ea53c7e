//! Logical Request/Response payloads, in their two wire
//! shapes. `GOB` carries opaque pre-serialized argument/result bytes
//! (the Rust analogue of Go's pre-registered concrete `gob` types —
//! the caller and the matched method handler agree on the concrete type
//! out of band; the frame layer never inspects it). `PROTOBUF` carries
//! the generic `DynamicValue` so arbitrary JSON-shaped payloads can cross
//! the wire without either side pre-registering a type.

use crate::value::DynamicValue;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GobRequest {
    pub request_id: u64,
    pub service_name: String,
    pub method_name: String,
    /// Bincode-serialized argument tuple; the concrete shape is known to
    /// both the caller and the registered method handler.
    pub args: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GobResponse {
    pub request_id: u64,
    pub code: i16,
    pub msg: String,
    /// Bincode-serialized result; empty when `code != 200`.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRequest {
    pub request_id: u64,
    pub service_name: String,
    pub method_name: String,
    pub args: Vec<DynamicValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    pub request_id: u64,
    pub code: i16,
    pub msg: String,
    pub data: DynamicValue,
}

pub const CODE_SUCCESS: i16 = 200;
pub const CODE_FAILURE: i16 = 500;

impl JsonResponse {
    pub fn success(request_id: u64, data: DynamicValue) -> JsonResponse {
        JsonResponse {
            request_id,
            code: CODE_SUCCESS,
            msg: "success".to_owned(),
            data,
        }
    }

    pub fn failure(request_id: u64, msg: impl Into<String>) -> JsonResponse {
        JsonResponse {
            request_id,
            code: CODE_FAILURE,
            msg: msg.into(),
            data: DynamicValue::Null,
        }
    }
}

impl GobResponse {
    pub fn success(request_id: u64, data: Vec<u8>) -> GobResponse {
        GobResponse {
            request_id,
            code: CODE_SUCCESS,
            msg: "success".to_owned(),
            data,
        }
    }

    pub fn failure(request_id: u64, msg: impl Into<String>) -> GobResponse {
        GobResponse {
            request_id,
            code: CODE_FAILURE,
            msg: msg.into(),
            data: Vec::new(),
        }
    }
}
