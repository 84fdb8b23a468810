//! Codec Tests
//!
//! Tests for request, reply, event, exception and handshake framing.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use hypercache::protocol::{
    decode_request, encode_accepted, encode_event, encode_rejected, encode_reply,
    encode_request, put_exception, read_event_payload, read_exception, read_handshake,
    read_handshake_reply, read_reply, read_reply_header, read_request_frame, Exception,
    ExceptionKind, Handshake, Opcode, Reply, ReplyShape, Request, RequestHeader, EVENT_HEADER_SIZE,
    MAX_PAYLOAD_SIZE, REQUEST_HEADER_SIZE,
};
use hypercache::HyperError;

// =============================================================================
// Helper Functions
// =============================================================================

/// Encode, read back off a stream and decode
fn round_trip(correlation_id: u32, request: &Request) -> Request {
    let frame = encode_request(correlation_id, request);
    let mut cursor = Cursor::new(frame.to_vec());
    let (id, body) = read_request_frame(&mut cursor, MAX_PAYLOAD_SIZE).unwrap();
    assert_eq!(id, correlation_id);
    assert_eq!(cursor.position() as usize, frame.len());
    decode_request(body).unwrap()
}

fn body(opcode: u8, payload: &[u8]) -> Bytes {
    let mut body = vec![opcode];
    body.extend_from_slice(payload);
    Bytes::from(body)
}

fn reply_round_trip(
    outcome: Result<Reply, Exception>,
    shape: ReplyShape,
) -> (u32, Result<Reply, Exception>) {
    let frame = encode_reply(42, &outcome);
    let mut cursor = Cursor::new(frame.to_vec());
    let decoded = read_reply(&mut cursor, shape).unwrap();
    assert_eq!(cursor.position() as usize, frame.len());
    decoded
}

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_ping() {
    assert_eq!(round_trip(1, &Request::Ping), Request::Ping);
}

#[test]
fn test_encode_decode_get() {
    let request = Request::Get { key: Bytes::from_static(b"hello") };
    assert_eq!(round_trip(7, &request), request);
}

#[test]
fn test_encode_decode_delete() {
    let request = Request::Delete { key: Bytes::from_static(b"gone") };
    assert_eq!(round_trip(8, &request), request);
}

#[test]
fn test_encode_decode_set() {
    let request = Request::Set {
        key: Bytes::from_static(b"mykey"),
        value: Bytes::from_static(b"myvalue"),
    };
    assert_eq!(round_trip(u32::MAX, &request), request);
}

#[test]
fn test_encode_decode_set_empty_value() {
    let request = Request::Set {
        key: Bytes::from_static(b"k"),
        value: Bytes::new(),
    };
    assert_eq!(round_trip(3, &request), request);
}

#[test]
fn test_encode_decode_remaining_opcodes() {
    let requests = [
        Request::Clear,
        Request::DeletePrefix { prefix: Bytes::from_static(b"user:") },
        Request::WalkPrefix { prefix: Bytes::new() },
        Request::Lock,
        Request::Unlock,
        Request::SendEvent { payload: Bytes::from_static(&[0, 1, 2, 255]) },
    ];
    for (id, request) in (100..).zip(requests.iter()) {
        assert_eq!(&round_trip(id, request), request);
    }
}

#[test]
fn test_encode_request_layout() {
    let frame = encode_request(
        0x0102_0304,
        &Request::Set {
            key: Bytes::from_static(b"ab"),
            value: Bytes::from_static(b"xyz"),
        },
    );

    let expected: Vec<u8> = [
        &[0x04, 0x03, 0x02, 0x01][..],
        &[10, 0, 0, 0],
        &[Opcode::Set as u8],
        &[2, 0, 0, 0],
        b"ab",
        b"xyz",
    ]
    .concat();
    assert_eq!(&frame[..], &expected[..]);
}

#[test]
fn test_decode_empty_body() {
    let err = decode_request(Bytes::new()).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::InvalidPacket);
    assert_eq!(err.description, "No start byte found.");
}

#[test]
fn test_decode_unknown_opcode() {
    for opcode in [10u8, 100, 255] {
        let err = decode_request(body(opcode, b"")).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::InvalidPacket);
        assert_eq!(err.description, "Unknown start byte.");
    }
}

#[test]
fn test_decode_set_missing_key_length() {
    let err = decode_request(body(Opcode::Set as u8, &[1, 0, 0])).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::InvalidPacket);
    assert_eq!(err.description, "Key length not specified.");
}

#[test]
fn test_decode_set_key_longer_than_payload() {
    let err = decode_request(body(Opcode::Set as u8, &[9, 0, 0, 0, b'a', b'b'])).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::InvalidPacket);
    assert_eq!(err.description, "Packet too short for key length.");
}

#[test]
fn test_decode_ignores_payload_on_empty_opcodes() {
    assert_eq!(decode_request(body(Opcode::Ping as u8, b"junk")).unwrap(), Request::Ping);
    assert_eq!(decode_request(body(Opcode::Lock as u8, b"junk")).unwrap(), Request::Lock);
}

#[test]
fn test_opcode_try_from() {
    assert_eq!(Opcode::try_from(0).unwrap(), Opcode::Ping);
    assert_eq!(Opcode::try_from(9).unwrap(), Opcode::SendEvent);
    assert_eq!(Opcode::try_from(10), Err(10));
}

#[test]
fn test_reply_shapes() {
    assert_eq!(Request::Ping.reply_shape(), ReplyShape::Empty);
    assert_eq!(Request::Get { key: Bytes::new() }.reply_shape(), ReplyShape::Value);
    assert_eq!(Request::Delete { key: Bytes::new() }.reply_shape(), ReplyShape::Flag);
    assert_eq!(
        Request::Set { key: Bytes::new(), value: Bytes::new() }.reply_shape(),
        ReplyShape::Flag
    );
    assert_eq!(Request::DeletePrefix { prefix: Bytes::new() }.reply_shape(), ReplyShape::Count);
    assert_eq!(Request::WalkPrefix { prefix: Bytes::new() }.reply_shape(), ReplyShape::Entries);
    assert_eq!(Request::SendEvent { payload: Bytes::new() }.reply_shape(), ReplyShape::Empty);
}

// =============================================================================
// Request Header Tests
// =============================================================================

#[test]
fn test_header_rejects_zero_correlation_id() {
    let mut cursor = Cursor::new(encode_request(0, &Request::Ping).to_vec());
    let err = read_request_frame(&mut cursor, MAX_PAYLOAD_SIZE).unwrap_err();
    assert!(matches!(err, HyperError::Protocol(_)));
}

#[test]
fn test_header_rejects_empty_body() {
    let header = RequestHeader { correlation_id: 1, body_len: 0 };
    assert!(matches!(header.validate(MAX_PAYLOAD_SIZE), Err(HyperError::Protocol(_))));
}

#[test]
fn test_header_rejects_oversized_body() {
    let header = RequestHeader { correlation_id: 1, body_len: 1025 };
    assert!(header.validate(1024).is_err());
    assert!(RequestHeader { correlation_id: 1, body_len: 1024 }.validate(1024).is_ok());
}

#[test]
fn test_header_parse() {
    let mut bytes = [0u8; REQUEST_HEADER_SIZE];
    bytes[..4].copy_from_slice(&9u32.to_le_bytes());
    bytes[4..].copy_from_slice(&300u32.to_le_bytes());

    let header = RequestHeader::parse(bytes);
    assert_eq!(header, RequestHeader { correlation_id: 9, body_len: 300 });
}

#[test]
fn test_read_truncated_frame() {
    let frame = encode_request(5, &Request::Get { key: Bytes::from_static(b"long key") });
    let mut cursor = Cursor::new(frame[..frame.len() - 3].to_vec());

    let err = read_request_frame(&mut cursor, MAX_PAYLOAD_SIZE).unwrap_err();
    assert!(matches!(err, HyperError::Io(_)));
}

#[test]
fn test_read_multiple_frames_from_stream() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&encode_request(1, &Request::Ping));
    stream.extend_from_slice(&encode_request(2, &Request::Get { key: Bytes::from_static(b"k") }));
    let mut cursor = Cursor::new(stream);

    let (first, _) = read_request_frame(&mut cursor, MAX_PAYLOAD_SIZE).unwrap();
    let (second, body) = read_request_frame(&mut cursor, MAX_PAYLOAD_SIZE).unwrap();

    assert_eq!((first, second), (1, 2));
    assert_eq!(decode_request(body).unwrap(), Request::Get { key: Bytes::from_static(b"k") });
}

// =============================================================================
// Reply Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_reply_empty() {
    let (id, outcome) = reply_round_trip(Ok(Reply::Empty), ReplyShape::Empty);
    assert_eq!(id, 42);
    assert_eq!(outcome, Ok(Reply::Empty));
}

#[test]
fn test_reply_value() {
    let value = Reply::Value(Bytes::from_static(b"world"));
    let (_, outcome) = reply_round_trip(Ok(value.clone()), ReplyShape::Value);
    assert_eq!(outcome, Ok(value));
}

#[test]
fn test_reply_flag_is_single_byte() {
    let frame = encode_reply(1, &Ok(Reply::Flag(true)));
    assert_eq!(&frame[..], &[1, 0, 0, 0, 0, 1]);

    let (_, outcome) = reply_round_trip(Ok(Reply::Flag(false)), ReplyShape::Flag);
    assert_eq!(outcome, Ok(Reply::Flag(false)));
}

#[test]
fn test_reply_invalid_flag_byte() {
    let mut cursor = Cursor::new(vec![1, 0, 0, 0, 0, 2]);
    let err = read_reply(&mut cursor, ReplyShape::Flag).unwrap_err();
    assert!(matches!(err, HyperError::Protocol(_)));
}

#[test]
fn test_reply_count() {
    let (_, outcome) = reply_round_trip(Ok(Reply::Count(u64::MAX - 1)), ReplyShape::Count);
    assert_eq!(outcome, Ok(Reply::Count(u64::MAX - 1)));
}

#[test]
fn test_reply_entries() {
    let entries = vec![
        (Bytes::from_static(b"user:2"), Bytes::from_static(b"bob")),
        (Bytes::from_static(b"user:1"), Bytes::new()),
    ];
    let (_, outcome) = reply_round_trip(Ok(Reply::Entries(entries.clone())), ReplyShape::Entries);
    assert_eq!(outcome, Ok(Reply::Entries(entries)));
}

#[test]
fn test_reply_entries_empty() {
    let (_, outcome) = reply_round_trip(Ok(Reply::Entries(vec![])), ReplyShape::Entries);
    assert_eq!(outcome, Ok(Reply::Entries(vec![])));
}

#[test]
fn test_reply_exception_ignores_shape() {
    let (_, outcome) = reply_round_trip(Err(Exception::not_found()), ReplyShape::Value);
    assert_eq!(outcome, Err(Exception::not_found()));
}

#[test]
fn test_reply_unknown_status() {
    let mut cursor = Cursor::new(vec![1, 0, 0, 0, 7]);
    let err = read_reply(&mut cursor, ReplyShape::Empty).unwrap_err();
    assert!(matches!(err, HyperError::Protocol(_)));
}

#[test]
fn test_reply_truncated_value() {
    // Claims 10 bytes, carries 3
    let mut frame = vec![1, 0, 0, 0, 0, 10, 0, 0, 0];
    frame.extend_from_slice(b"abc");
    let mut cursor = Cursor::new(frame);

    let err = read_reply(&mut cursor, ReplyShape::Value).unwrap_err();
    assert!(matches!(err, HyperError::Io(_)));
}

// =============================================================================
// Exception Frame Tests
// =============================================================================

#[test]
fn test_exception_frame_layout() {
    let mut frame = BytesMut::new();
    put_exception(&mut frame, &Exception::unlock_error());

    let mut expected = vec![11u8];
    expected.extend_from_slice(b"UnlockError");
    expected.push(27);
    expected.extend_from_slice(b"Mutex was already unlocked.");
    assert_eq!(&frame[..], &expected[..]);
}

#[test]
fn test_exception_unknown_name_preserved() {
    let exception = Exception::new(ExceptionKind::from_name("Overloaded"), "try later");

    let mut frame = BytesMut::new();
    put_exception(&mut frame, &exception);
    let decoded = read_exception(&mut Cursor::new(frame.to_vec())).unwrap();

    assert_eq!(decoded.kind, ExceptionKind::Other("Overloaded".to_string()));
    assert_eq!(decoded.kind.name(), "Overloaded");
    assert_eq!(decoded.description, "try later");
}

#[test]
fn test_exception_fields_truncated() {
    let exception = Exception::invalid_packet("x".repeat(400));

    let mut frame = BytesMut::new();
    put_exception(&mut frame, &exception);
    let decoded = read_exception(&mut Cursor::new(frame.to_vec())).unwrap();

    assert_eq!(decoded.kind, ExceptionKind::InvalidPacket);
    assert_eq!(decoded.description.len(), 255);
}

#[test]
fn test_exception_kind_names() {
    for kind in [
        ExceptionKind::InvalidPacket,
        ExceptionKind::NotFound,
        ExceptionKind::UnlockError,
        ExceptionKind::InvalidCredentials,
        ExceptionKind::DatabaseNotFound,
    ] {
        assert_eq!(ExceptionKind::from_name(kind.name()), kind);
    }
}

#[test]
fn test_exception_display() {
    assert_eq!(
        Exception::not_found().to_string(),
        "NotFound: The key was not found in the database."
    );
}

// =============================================================================
// Event Frame Tests
// =============================================================================

#[test]
fn test_event_frame_layout() {
    let frame = encode_event(b"hey");

    assert_eq!(frame.len(), EVENT_HEADER_SIZE + 3);
    assert_eq!(&frame[..], &[0, 0, 0, 0, 0, 3, 0, 0, 0, b'h', b'e', b'y']);
}

#[test]
fn test_event_frame_read() {
    let mut cursor = Cursor::new(encode_event(b"payload").to_vec());

    let (id, marker) = read_reply_header(&mut cursor).unwrap();
    assert_eq!((id, marker), (0, 0));
    assert_eq!(&read_event_payload(&mut cursor).unwrap()[..], b"payload");
}

#[test]
fn test_event_frame_empty_payload() {
    let mut cursor = Cursor::new(encode_event(b"").to_vec());

    read_reply_header(&mut cursor).unwrap();
    assert!(read_event_payload(&mut cursor).unwrap().is_empty());
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_handshake_round_trip() {
    let handshake = Handshake::new(3, "hunter2");
    let encoded = handshake.encode().unwrap();

    assert_eq!(&encoded[..4], b"HNP1");
    assert_eq!(read_handshake(&mut Cursor::new(encoded.to_vec())).unwrap(), handshake);
}

#[test]
fn test_handshake_empty_password() {
    let handshake = Handshake::new(0, Bytes::new());
    let encoded = handshake.encode().unwrap();

    assert_eq!(&encoded[..], b"HNP1\x00\x00\x00\x00");
    assert_eq!(read_handshake(&mut Cursor::new(encoded.to_vec())).unwrap(), handshake);
}

#[test]
fn test_handshake_bad_magic() {
    let mut encoded = Handshake::new(0, "pw").encode().unwrap().to_vec();
    encoded[3] = b'2';

    let err = read_handshake(&mut Cursor::new(encoded)).unwrap_err();
    assert_eq!(err.exception_kind(), Some(&ExceptionKind::InvalidPacket));
}

#[test]
fn test_handshake_password_too_long() {
    let handshake = Handshake::new(0, vec![b'p'; u16::MAX as usize + 1]);
    assert!(matches!(handshake.encode(), Err(HyperError::Config(_))));
}

#[test]
fn test_handshake_accepted() {
    let mut cursor = Cursor::new(encode_accepted().to_vec());
    read_handshake_reply(&mut cursor).unwrap();
}

#[test]
fn test_handshake_rejected() {
    let frame = encode_rejected(&Exception::invalid_credentials());
    let err = read_handshake_reply(&mut Cursor::new(frame.to_vec())).unwrap_err();

    assert_eq!(err.exception_kind(), Some(&ExceptionKind::InvalidCredentials));
    assert!(!err.is_not_found());
}

#[test]
fn test_handshake_unknown_status() {
    let err = read_handshake_reply(&mut Cursor::new(vec![9])).unwrap_err();
    assert!(matches!(err, HyperError::Protocol(_)));
}
