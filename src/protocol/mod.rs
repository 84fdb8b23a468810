//! Protocol Module
//!
//! Defines HNP, the wire protocol shared by server and client.
//!
//! ## Protocol Format
//!
//! A connection opens with a handshake naming the database and the shared
//! secret. After that the client sends request frames tagged with a nonzero
//! correlation id; the server answers each with a reply frame echoing the id,
//! in whatever order the requests finish. Correlation id 0 is reserved for
//! events the server pushes on its own.
//!
//! ### Opcodes
//! - 0: PING          - Payload: empty
//! - 1: GET           - Payload: key
//! - 2: DELETE        - Payload: key
//! - 3: SET           - Payload: key_len (4) + key + value
//! - 4: CLEAR         - Payload: empty
//! - 5: DELETE_PREFIX - Payload: prefix
//! - 6: WALK_PREFIX   - Payload: prefix
//! - 7: LOCK          - Payload: empty
//! - 8: UNLOCK        - Payload: empty
//! - 9: EVENT         - Payload: event bytes
//!
//! ### Status Codes
//! - 0x00: OK, opcode-specific payload follows
//! - 0x01: EXCEPTION, exception frame follows

mod codec;
mod exception;
mod handshake;
mod reply;
mod request;

pub use codec::{
    decode_request, encode_event, encode_reply, encode_request, event_header, put_exception,
    read_body, read_event_payload, read_exception, read_reply, read_reply_header,
    read_reply_payload, read_request_frame, read_request_header, write_frame, RequestHeader,
    EVENT_CORRELATION_ID, EVENT_HEADER_SIZE, EVENT_MARKER, MAX_PAYLOAD_SIZE, REPLY_HEADER_SIZE,
    REQUEST_HEADER_SIZE,
};
pub use exception::{Exception, ExceptionKind};
pub use handshake::{
    encode_accepted, encode_rejected, read_handshake, read_handshake_reply, Handshake, MAGIC,
};
pub use reply::{Reply, ReplyShape, Status};
pub use request::{Opcode, Request};
