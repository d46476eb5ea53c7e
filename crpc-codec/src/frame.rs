//! Fixed 17-byte frame header, generalized from the length-prefixed
//! `Header` parsing in `t51core/src/net/frame.rs` (which reads a one-byte
//! class discriminator plus a sequence number off a `byteorder` stream)
//! to this wire layout: magic, version, full length, message type,
//! compress type, serializer type, request id.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const MAGIC: u8 = 0x1d;
pub const VERSION: u8 = 0x01;
pub const HEADER_SIZE: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Ping,
    Pong,
}

impl MessageType {
    fn to_byte(self) -> u8 {
        match self {
            MessageType::Request => 0,
            MessageType::Response => 1,
            MessageType::Ping => 2,
            MessageType::Pong => 3,
        }
    }

    fn from_byte(b: u8) -> Result<MessageType> {
        match b {
            0 => Ok(MessageType::Request),
            1 => Ok(MessageType::Response),
            2 => Ok(MessageType::Ping),
            3 => Ok(MessageType::Pong),
            other => Err(Error::UnknownMessageType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressType {
    Gzip,
}

impl CompressType {
    fn to_byte(self) -> u8 {
        match self {
            CompressType::Gzip => 0,
        }
    }

    fn from_byte(b: u8) -> Result<CompressType> {
        match b {
            0 => Ok(CompressType::Gzip),
            other => Err(Error::UnknownCompressor(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializerType {
    Gob,
    Protobuf,
}

impl SerializerType {
    fn to_byte(self) -> u8 {
        match self {
            SerializerType::Gob => 0,
            SerializerType::Protobuf => 1,
        }
    }

    fn from_byte(b: u8) -> Result<SerializerType> {
        match b {
            0 => Ok(SerializerType::Gob),
            1 => Ok(SerializerType::Protobuf),
            other => Err(Error::UnknownSerializer(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u8,
    pub version: u8,
    pub full_length: u32,
    pub message_type: MessageType,
    pub compress_type: CompressType,
    pub serializer_type: SerializerType,
    pub request_id: u64,
}

/// A complete on-the-wire message: header plus the (serialized, then
/// compressed) body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub body: Vec<u8>,
}

impl Frame {
    /// Builds a frame from its logical fields and an already
    /// serialized-then-compressed body, computing `fullLength`.
    pub fn new(
        message_type: MessageType,
        serializer_type: SerializerType,
        compress_type: CompressType,
        request_id: u64,
        body: Vec<u8>,
    ) -> Frame {
        let full_length = (HEADER_SIZE + body.len()) as u32;
        Frame {
            header: Header {
                magic: MAGIC,
                version: VERSION,
                full_length,
                message_type,
                compress_type,
                serializer_type,
                request_id,
            },
            body,
        }
    }

    /// Writes the 17-byte header followed by the body to `writer`.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.header.magic)?;
        writer.write_u8(self.header.version)?;
        writer.write_u32::<BigEndian>(self.header.full_length)?;
        writer.write_u8(self.header.message_type.to_byte())?;
        writer.write_u8(self.header.compress_type.to_byte())?;
        writer.write_u8(self.header.serializer_type.to_byte())?;
        writer.write_u64::<BigEndian>(self.header.request_id)?;
        writer.write_all(&self.body)?;
        Ok(())
    }

    /// Reads exactly one frame from `reader`. A short read on the header
    /// or the declared body is fatal (`Error::Truncated`/`Error::Io`).
    pub fn decode<R: Read>(reader: &mut R) -> Result<Frame> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Truncated
            } else {
                Error::Io(e)
            }
        })?;

        let mut cursor = &header_bytes[..];
        let magic = cursor.read_u8()?;
        if magic != MAGIC {
            return Err(Error::MagicMismatch {
                expected: MAGIC,
                actual: magic,
            });
        }
        let version = cursor.read_u8()?;
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                actual: version,
            });
        }
        let full_length = cursor.read_u32::<BigEndian>()?;
        if (full_length as usize) < HEADER_SIZE {
            return Err(Error::InvalidLength(full_length));
        }
        let message_type = MessageType::from_byte(cursor.read_u8()?)?;
        let compress_type = CompressType::from_byte(cursor.read_u8()?)?;
        let serializer_type = SerializerType::from_byte(cursor.read_u8()?)?;
        let request_id = cursor.read_u64::<BigEndian>()?;

        let body_len = full_length as usize - HEADER_SIZE;
        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Truncated
            } else {
                Error::Io(e)
            }
        })?;

        Ok(Frame {
            header: Header {
                magic,
                version,
                full_length,
                message_type,
                compress_type,
                serializer_type,
                request_id,
            },
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(message_type: MessageType, serializer_type: SerializerType, compress_type: CompressType, request_id: u64, body: Vec<u8>) {
        let frame = Frame::new(message_type, serializer_type, compress_type, request_id, body.clone());
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();

        assert_eq!(buf[0], MAGIC);
        assert_eq!(buf[1], VERSION);
        let declared_len = BigEndian::read_u32(&buf[2..6]) as usize;
        assert_eq!(declared_len, buf.len());

        let mut cursor = Cursor::new(buf);
        let decoded = Frame::decode(&mut cursor).unwrap();
        assert_eq!(decoded.header.request_id, request_id);
        assert_eq!(decoded.header.message_type, message_type);
        assert_eq!(decoded.header.serializer_type, serializer_type);
        assert_eq!(decoded.header.compress_type, compress_type);
        assert_eq!(decoded.body, body);
    }

    #[test]
    fn frame_round_trips_across_payload_shapes() {
        roundtrip(MessageType::Request, SerializerType::Gob, CompressType::Gzip, 1, vec![]);
        roundtrip(MessageType::Response, SerializerType::Protobuf, CompressType::Gzip, 42, vec![1, 2, 3, 4]);
        roundtrip(MessageType::Ping, SerializerType::Gob, CompressType::Gzip, u64::MAX, vec![0; 4096]);
        roundtrip(MessageType::Pong, SerializerType::Protobuf, CompressType::Gzip, 0, b"hello world".to_vec());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let frame = Frame::new(MessageType::Request, SerializerType::Gob, CompressType::Gzip, 1, vec![9]);
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();
        buf[0] = 0xff;
        let mut cursor = Cursor::new(buf);
        match Frame::decode(&mut cursor) {
            Err(Error::MagicMismatch { .. }) => {}
            other => panic!("expected magic mismatch, got {:?}", other),
        }
    }

    #[test]
    fn truncated_header_is_fatal() {
        let mut cursor = Cursor::new(vec![MAGIC, VERSION, 0, 0]);
        match Frame::decode(&mut cursor) {
            Err(Error::Truncated) => {}
            other => panic!("expected truncated error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_body_is_fatal() {
        let frame = Frame::new(MessageType::Request, SerializerType::Gob, CompressType::Gzip, 1, vec![1, 2, 3, 4, 5]);
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        let mut cursor = Cursor::new(buf);
        match Frame::decode(&mut cursor) {
            Err(Error::Truncated) => {}
            other => panic!("expected truncated error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let frame = Frame::new(MessageType::Request, SerializerType::Gob, CompressType::Gzip, 1, vec![]);
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();
        buf[6] = 9;
        let mut cursor = Cursor::new(buf);
        match Frame::decode(&mut cursor) {
            Err(Error::UnknownMessageType(9)) => {}
            other => panic!("expected unknown message type, got {:?}", other),
        }
    }
}
