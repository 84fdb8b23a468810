//! Protocol codec
//!
//! Encoding and decoding functions for HNP frames. All integers are
//! little-endian.
//!
//! ## Wire Format
//!
//! ### Request Frame
//! ```text
//! ┌──────────────┬──────────────┬──────────┬──────────────────┐
//! │ CorrId (4)   │ Len (4)      │ Op (1)   │ Payload          │
//! └──────────────┴──────────────┴──────────┴──────────────────┘
//!                 Len = 1 + payload length
//! ```
//!
//! ### Reply Frame
//! ```text
//! ┌──────────────┬──────────┬─────────────────────────────────┐
//! │ CorrId (4)   │Status(1) │ Opcode payload | Exception      │
//! └──────────────┴──────────┴─────────────────────────────────┘
//! ```
//!
//! ### Event Frame
//! ```text
//! ┌──────────────┬──────────┬──────────────┬──────────────────┐
//! │ 0 (4)        │ 0 (1)    │ Len (4)      │ Payload          │
//! └──────────────┴──────────┴──────────────┴──────────────────┘
//! ```
//!
//! ### Exception Frame
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────────────────────┐
//! │NameLen(1)│ Name     │DescLen(1)│ Description              │
//! └──────────┴──────────┴──────────┴──────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Exception, ExceptionKind, Opcode, Reply, ReplyShape, Request, Status};
use crate::error::{HyperError, Result};

/// Request header: correlation id (4) + body length (4)
pub const REQUEST_HEADER_SIZE: usize = 8;

/// Reply header: correlation id (4) + status or event marker (1)
pub const REPLY_HEADER_SIZE: usize = 5;

/// Event header: zero correlation id (4) + marker (1) + length (4)
pub const EVENT_HEADER_SIZE: usize = 9;

/// Correlation id reserved for server-pushed events
pub const EVENT_CORRELATION_ID: u32 = 0;

/// Marker byte of a supported event frame
pub const EVENT_MARKER: u8 = 0;

/// Default largest request body (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Header of a request frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub correlation_id: u32,
    /// Opcode byte plus payload
    pub body_len: u32,
}

impl RequestHeader {
    pub fn parse(bytes: [u8; REQUEST_HEADER_SIZE]) -> Self {
        let mut buf = &bytes[..];
        Self {
            correlation_id: buf.get_u32_le(),
            body_len: buf.get_u32_le(),
        }
    }

    /// Zero ids belong to events and an empty body has no opcode
    pub fn validate(&self, max_body_len: u32) -> Result<()> {
        if self.correlation_id == EVENT_CORRELATION_ID {
            return Err(HyperError::Protocol(
                "request uses the reserved correlation id 0".to_string(),
            ));
        }
        if self.body_len == 0 {
            return Err(HyperError::Protocol("request body is empty".to_string()));
        }
        if self.body_len > max_body_len {
            return Err(HyperError::Protocol(format!(
                "request body too large: {} bytes (max {})",
                self.body_len, max_body_len
            )));
        }
        Ok(())
    }
}

/// Encode a full request frame
pub fn encode_request(correlation_id: u32, request: &Request) -> Bytes {
    let payload_len = match request {
        Request::Get { key } | Request::Delete { key } => key.len(),
        Request::Set { key, value } => 4 + key.len() + value.len(),
        Request::DeletePrefix { prefix } | Request::WalkPrefix { prefix } => prefix.len(),
        Request::SendEvent { payload } => payload.len(),
        Request::Ping | Request::Clear | Request::Lock | Request::Unlock => 0,
    };

    let mut frame = BytesMut::with_capacity(REQUEST_HEADER_SIZE + 1 + payload_len);
    frame.put_u32_le(correlation_id);
    frame.put_u32_le((1 + payload_len) as u32);
    frame.put_u8(request.opcode() as u8);

    match request {
        Request::Get { key } | Request::Delete { key } => frame.put_slice(key),
        Request::Set { key, value } => {
            frame.put_u32_le(key.len() as u32);
            frame.put_slice(key);
            frame.put_slice(value);
        }
        Request::DeletePrefix { prefix } | Request::WalkPrefix { prefix } => {
            frame.put_slice(prefix)
        }
        Request::SendEvent { payload } => frame.put_slice(payload),
        Request::Ping | Request::Clear | Request::Lock | Request::Unlock => {}
    }

    frame.freeze()
}

/// Decode a request body (opcode byte plus payload)
///
/// Failures are reported to the requester, so they come back as exceptions.
pub fn decode_request(body: Bytes) -> std::result::Result<Request, Exception> {
    if body.is_empty() {
        return Err(Exception::invalid_packet("No start byte found."));
    }

    let opcode = Opcode::try_from(body[0])
        .map_err(|_| Exception::invalid_packet("Unknown start byte."))?;
    let payload = body.slice(1..);

    Ok(match opcode {
        Opcode::Ping => Request::Ping,
        Opcode::Get => Request::Get { key: payload },
        Opcode::Delete => Request::Delete { key: payload },
        Opcode::Set => decode_set(payload)?,
        Opcode::Clear => Request::Clear,
        Opcode::DeletePrefix => Request::DeletePrefix { prefix: payload },
        Opcode::WalkPrefix => Request::WalkPrefix { prefix: payload },
        Opcode::Lock => Request::Lock,
        Opcode::Unlock => Request::Unlock,
        Opcode::SendEvent => Request::SendEvent { payload },
    })
}

/// Decode SET payload: key_len (4) + key + value
fn decode_set(payload: Bytes) -> std::result::Result<Request, Exception> {
    if payload.len() < 4 {
        return Err(Exception::invalid_packet("Key length not specified."));
    }

    let key_len = (&payload[..4]).get_u32_le() as usize;
    let rest = payload.slice(4..);
    if rest.len() < key_len {
        return Err(Exception::invalid_packet("Packet too short for key length."));
    }

    Ok(Request::Set {
        key: rest.slice(..key_len),
        value: rest.slice(key_len..),
    })
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a full reply frame for a success or an exception
pub fn encode_reply(
    correlation_id: u32,
    outcome: &std::result::Result<Reply, Exception>,
) -> Bytes {
    let mut frame = BytesMut::with_capacity(REPLY_HEADER_SIZE + reply_size_hint(outcome));
    frame.put_u32_le(correlation_id);

    match outcome {
        Ok(reply) => {
            frame.put_u8(Status::Ok as u8);
            put_reply(&mut frame, reply);
        }
        Err(exception) => {
            frame.put_u8(Status::Exception as u8);
            put_exception(&mut frame, exception);
        }
    }

    frame.freeze()
}

fn reply_size_hint(outcome: &std::result::Result<Reply, Exception>) -> usize {
    match outcome {
        Ok(Reply::Empty) => 0,
        Ok(Reply::Value(value)) => 4 + value.len(),
        Ok(Reply::Flag(_)) => 1,
        Ok(Reply::Count(_)) => 8,
        Ok(Reply::Entries(entries)) => {
            4 + entries
                .iter()
                .map(|(key, value)| 8 + key.len() + value.len())
                .sum::<usize>()
        }
        Err(exception) => 2 + exception.kind.name().len() + exception.description.len(),
    }
}

fn put_reply(frame: &mut BytesMut, reply: &Reply) {
    match reply {
        Reply::Empty => {}
        Reply::Value(value) => {
            frame.put_u32_le(value.len() as u32);
            frame.put_slice(value);
        }
        Reply::Flag(flag) => frame.put_u8(u8::from(*flag)),
        Reply::Count(count) => frame.put_u64_le(*count),
        Reply::Entries(entries) => {
            frame.put_u32_le(entries.len() as u32);
            for (key, value) in entries {
                frame.put_u32_le(key.len() as u32);
                frame.put_slice(key);
                frame.put_u32_le(value.len() as u32);
                frame.put_slice(value);
            }
        }
    }
}

/// Read the correlation id and status/marker byte of an incoming frame
pub fn read_reply_header<R: Read>(reader: &mut R) -> Result<(u32, u8)> {
    let mut header = [0u8; REPLY_HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let mut buf = &header[..];
    Ok((buf.get_u32_le(), buf.get_u8()))
}

/// Read a success payload of a known shape
pub fn read_reply_payload<R: Read>(reader: &mut R, shape: ReplyShape) -> Result<Reply> {
    Ok(match shape {
        ReplyShape::Empty => Reply::Empty,
        ReplyShape::Value => Reply::Value(read_len_prefixed(reader)?),
        ReplyShape::Flag => match read_u8(reader)? {
            0 => Reply::Flag(false),
            1 => Reply::Flag(true),
            other => {
                return Err(HyperError::Protocol(format!(
                    "invalid flag byte 0x{:02x}",
                    other
                )))
            }
        },
        ReplyShape::Count => {
            let mut count = [0u8; 8];
            reader.read_exact(&mut count)?;
            Reply::Count(u64::from_le_bytes(count))
        }
        ReplyShape::Entries => {
            let count = read_u32(reader)?;
            let mut entries = Vec::new();
            for _ in 0..count {
                let key = read_len_prefixed(reader)?;
                let value = read_len_prefixed(reader)?;
                entries.push((key, value));
            }
            Reply::Entries(entries)
        }
    })
}

/// Read a complete reply frame whose shape is known
pub fn read_reply<R: Read>(
    reader: &mut R,
    shape: ReplyShape,
) -> Result<(u32, std::result::Result<Reply, Exception>)> {
    let (correlation_id, status) = read_reply_header(reader)?;
    let outcome = match status {
        s if s == Status::Ok as u8 => Ok(read_reply_payload(reader, shape)?),
        s if s == Status::Exception as u8 => Err(read_exception(reader)?),
        other => {
            return Err(HyperError::Protocol(format!(
                "unknown reply status 0x{:02x}",
                other
            )))
        }
    };
    Ok((correlation_id, outcome))
}

// =============================================================================
// Exception Frames
// =============================================================================

/// Append an exception frame; name and description are cut to 255 bytes
pub fn put_exception(frame: &mut BytesMut, exception: &Exception) {
    for field in [exception.kind.name().as_bytes(), exception.description.as_bytes()] {
        let field = &field[..field.len().min(u8::MAX as usize)];
        frame.put_u8(field.len() as u8);
        frame.put_slice(field);
    }
}

/// Read an exception frame
pub fn read_exception<R: Read>(reader: &mut R) -> Result<Exception> {
    let name = read_short_string(reader)?;
    let description = read_short_string(reader)?;
    Ok(Exception::new(ExceptionKind::from_name(&name), description))
}

fn read_short_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u8(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// =============================================================================
// Event Frames
// =============================================================================

/// Header preceding an event payload
pub fn event_header(payload_len: usize) -> [u8; EVENT_HEADER_SIZE] {
    let mut header = [0u8; EVENT_HEADER_SIZE];
    let mut buf = &mut header[..];
    buf.put_u32_le(EVENT_CORRELATION_ID);
    buf.put_u8(EVENT_MARKER);
    buf.put_u32_le(payload_len as u32);
    header
}

/// Encode a full event frame
pub fn encode_event(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(EVENT_HEADER_SIZE + payload.len());
    frame.put_slice(&event_header(payload.len()));
    frame.put_slice(payload);
    frame.freeze()
}

/// Read an event payload once the 5-byte frame header has been consumed
pub fn read_event_payload<R: Read>(reader: &mut R) -> Result<Bytes> {
    read_len_prefixed(reader)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a request header
pub fn read_request_header<R: Read>(reader: &mut R) -> Result<RequestHeader> {
    let mut header = [0u8; REQUEST_HEADER_SIZE];
    reader.read_exact(&mut header)?;
    Ok(RequestHeader::parse(header))
}

/// Read exactly `len` bytes of request body
pub fn read_body<R: Read>(reader: &mut R, len: u32) -> Result<Bytes> {
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    Ok(Bytes::from(body))
}

/// Read and validate a complete request frame, returning its id and body
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_request_frame<R: Read>(reader: &mut R, max_body_len: u32) -> Result<(u32, Bytes)> {
    let header = read_request_header(reader)?;
    header.validate(max_body_len)?;
    let body = read_body(reader, header.body_len)?;
    Ok((header.correlation_id, body))
}

/// Write a frame and flush it
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Read a `u32` length then that many bytes
///
/// Grows the buffer as data arrives instead of trusting the length up front.
fn read_len_prefixed<R: Read>(reader: &mut R) -> Result<Bytes> {
    let len = read_u32(reader)? as u64;
    let mut bytes = Vec::new();
    let read = reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if (read as u64) < len {
        return Err(HyperError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, read),
        )));
    }
    Ok(Bytes::from(bytes))
}
