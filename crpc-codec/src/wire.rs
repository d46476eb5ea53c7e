//! Ties `frame`, `compress` and `envelope` together into the `encode`/
//! `decode` operations: serialize first, then compress on the way out;
//! decompress first, then deserialize on the way in.

use crate::compress::{Compressor, Gzip};
use crate::envelope::{GobRequest, GobResponse, JsonRequest, JsonResponse};
use crate::error::{Error, Result};
use crate::frame::{CompressType, Frame, MessageType, SerializerType};
use std::io::Write;

fn compressor_for(compress_type: CompressType) -> impl Compressor {
    match compress_type {
        CompressType::Gzip => Gzip,
    }
}

#[derive(Debug, Clone)]
pub enum RequestPayload {
    Gob(GobRequest),
    Json(JsonRequest),
}

#[derive(Debug, Clone)]
pub enum ResponsePayload {
    Gob(GobResponse),
    Json(JsonResponse),
}

impl RequestPayload {
    pub fn request_id(&self) -> u64 {
        match self {
            RequestPayload::Gob(r) => r.request_id,
            RequestPayload::Json(r) => r.request_id,
        }
    }

    pub fn service_name(&self) -> &str {
        match self {
            RequestPayload::Gob(r) => &r.service_name,
            RequestPayload::Json(r) => &r.service_name,
        }
    }

    pub fn method_name(&self) -> &str {
        match self {
            RequestPayload::Gob(r) => &r.method_name,
            RequestPayload::Json(r) => &r.method_name,
        }
    }
}

impl ResponsePayload {
    pub fn request_id(&self) -> u64 {
        match self {
            ResponsePayload::Gob(r) => r.request_id,
            ResponsePayload::Json(r) => r.request_id,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            ResponsePayload::Gob(r) => r.code,
            ResponsePayload::Json(r) => r.code,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            ResponsePayload::Gob(r) => &r.msg,
            ResponsePayload::Json(r) => &r.msg,
        }
    }
}

fn body_for_request(payload: &RequestPayload) -> Result<(SerializerType, Vec<u8>)> {
    match payload {
        RequestPayload::Gob(req) => Ok((SerializerType::Gob, bincode::serialize(req)?)),
        RequestPayload::Json(req) => Ok((SerializerType::Protobuf, serde_json::to_vec(req)?)),
    }
}

fn body_for_response(payload: &ResponsePayload) -> Result<(SerializerType, Vec<u8>)> {
    match payload {
        ResponsePayload::Gob(rsp) => Ok((SerializerType::Gob, bincode::serialize(rsp)?)),
        ResponsePayload::Json(rsp) => Ok((SerializerType::Protobuf, serde_json::to_vec(rsp)?)),
    }
}

/// Encodes and writes a Request frame: serialize, then compress, then
/// write the 17-byte header and the compressed body.
pub fn encode_request<W: Write>(
    writer: &mut W,
    compress_type: CompressType,
    payload: &RequestPayload,
) -> Result<()> {
    let request_id = payload.request_id();
    let (serializer_type, body) = body_for_request(payload)?;
    let compressed = compressor_for(compress_type).compress(&body)?;
    let frame = Frame::new(
        MessageType::Request,
        serializer_type,
        compress_type,
        request_id,
        compressed,
    );
    frame.encode(writer)
}

/// Encodes and writes a Response frame. The caller must pass the same
/// `compress_type`/`serializer_type` the request arrived with.
pub fn encode_response<W: Write>(
    writer: &mut W,
    compress_type: CompressType,
    payload: &ResponsePayload,
) -> Result<()> {
    let request_id = payload.request_id();
    let (serializer_type, body) = body_for_response(payload)?;
    let compressed = compressor_for(compress_type).compress(&body)?;
    let frame = Frame::new(
        MessageType::Response,
        serializer_type,
        compress_type,
        request_id,
        compressed,
    );
    frame.encode(writer)
}

/// Decodes a previously-read `Frame` known to carry a Request.
pub fn decode_request(frame: &Frame) -> Result<RequestPayload> {
    if frame.header.message_type != MessageType::Request {
        return Err(Error::UnexpectedMessageType {
            wanted: "Request",
            got: message_type_byte(frame.header.message_type),
        });
    }
    let body = compressor_for(frame.header.compress_type).uncompress(&frame.body)?;
    match frame.header.serializer_type {
        SerializerType::Gob => Ok(RequestPayload::Gob(bincode::deserialize(&body)?)),
        SerializerType::Protobuf => Ok(RequestPayload::Json(serde_json::from_slice(&body)?)),
    }
}

/// Decodes a previously-read `Frame` known to carry a Response.
pub fn decode_response(frame: &Frame) -> Result<ResponsePayload> {
    if frame.header.message_type != MessageType::Response {
        return Err(Error::UnexpectedMessageType {
            wanted: "Response",
            got: message_type_byte(frame.header.message_type),
        });
    }
    let body = compressor_for(frame.header.compress_type).uncompress(&frame.body)?;
    match frame.header.serializer_type {
        SerializerType::Gob => Ok(ResponsePayload::Gob(bincode::deserialize(&body)?)),
        SerializerType::Protobuf => Ok(ResponsePayload::Json(serde_json::from_slice(&body)?)),
    }
}

fn message_type_byte(t: MessageType) -> u8 {
    match t {
        MessageType::Request => 0,
        MessageType::Response => 1,
        MessageType::Ping => 2,
        MessageType::Pong => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DynamicValue;
    use std::io::Cursor;

    #[test]
    fn gob_request_round_trips() {
        let req = GobRequest {
            request_id: 7,
            service_name: "goods".to_owned(),
            method_name: "Find".to_owned(),
            args: bincode::serialize(&(1001i64,)).unwrap(),
        };
        let mut buf = Vec::new();
        encode_request(&mut buf, CompressType::Gzip, &RequestPayload::Gob(req.clone())).unwrap();

        let mut cursor = Cursor::new(buf);
        let frame = Frame::decode(&mut cursor).unwrap();
        match decode_request(&frame).unwrap() {
            RequestPayload::Gob(decoded) => {
                assert_eq!(decoded.request_id, req.request_id);
                assert_eq!(decoded.service_name, req.service_name);
                assert_eq!(decoded.method_name, req.method_name);
                assert_eq!(decoded.args, req.args);
            }
            other => panic!("expected Gob payload, got {:?}", other),
        }
    }

    #[test]
    fn json_response_round_trips_with_nested_dynamic_value() {
        let rsp = JsonResponse::success(
            7,
            DynamicValue::Map(vec![
                ("id".to_owned(), DynamicValue::UInt(1001)),
                ("name".to_owned(), DynamicValue::String("widget".into())),
            ]),
        );
        let mut buf = Vec::new();
        encode_response(&mut buf, CompressType::Gzip, &ResponsePayload::Json(rsp.clone())).unwrap();

        let mut cursor = Cursor::new(buf);
        let frame = Frame::decode(&mut cursor).unwrap();
        match decode_response(&frame).unwrap() {
            ResponsePayload::Json(decoded) => assert_eq!(decoded, rsp),
            other => panic!("expected Json payload, got {:?}", other),
        }
    }

    #[test]
    fn decoding_a_response_as_a_request_fails() {
        let rsp = JsonResponse::success(1, DynamicValue::Null);
        let mut buf = Vec::new();
        encode_response(&mut buf, CompressType::Gzip, &ResponsePayload::Json(rsp)).unwrap();
        let mut cursor = Cursor::new(buf);
        let frame = Frame::decode(&mut cursor).unwrap();
        match decode_request(&frame) {
            Err(Error::UnexpectedMessageType { .. }) => {}
            other => panic!("expected unexpected-message-type error, got {:?}", other),
        }
    }
}
