//! Frame encoder/decoder with pluggable serializer (`GOB`, `PROTOBUF`) and
//! compressor (`GZIP`): a length-prefixed binary header over a raw
//! `TcpStream`, carrying a serialize-then-compress body.

pub mod compress;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod value;
pub mod wire;

pub use compress::{Compressor, Gzip};
pub use envelope::{GobRequest, GobResponse, JsonRequest, JsonResponse, CODE_FAILURE, CODE_SUCCESS};
pub use error::{Error, Result};
pub use frame::{CompressType, Frame, Header, MessageType, SerializerType, HEADER_SIZE, MAGIC, VERSION};
pub use value::DynamicValue;
pub use wire::{decode_request, decode_response, encode_request, encode_response, RequestPayload, ResponsePayload};
