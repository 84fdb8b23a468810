//! Connection handshake
//!
//! ```text
//! Client → Server:  "HNP1" | db (2) | pw_len (2) | password
//! Server → Client:  0x00                      (accepted)
//!                   0x01 | exception frame    (rejected, then closed)
//! ```

use std::io::Read;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::codec::{put_exception, read_exception};
use super::Exception;
use crate::error::{HyperError, Result};

/// Protocol magic opening every connection
pub const MAGIC: &[u8; 4] = b"HNP1";

/// Magic (4) + database index (2) + password length (2)
pub const HANDSHAKE_HEADER_SIZE: usize = 8;

const ACCEPTED: u8 = 0x00;
const REJECTED: u8 = 0x01;

/// The client's opening message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub database: u16,
    pub password: Bytes,
}

impl Handshake {
    pub fn new(database: u16, password: impl Into<Bytes>) -> Self {
        Self {
            database,
            password: password.into(),
        }
    }

    /// Encode the handshake; passwords longer than `u16::MAX` are rejected
    pub fn encode(&self) -> Result<Bytes> {
        let password_len = u16::try_from(self.password.len()).map_err(|_| {
            HyperError::Config("password does not fit the handshake length field".to_string())
        })?;

        let mut frame = BytesMut::with_capacity(HANDSHAKE_HEADER_SIZE + self.password.len());
        frame.put_slice(MAGIC);
        frame.put_u16_le(self.database);
        frame.put_u16_le(password_len);
        frame.put_slice(&self.password);
        Ok(frame.freeze())
    }
}

/// Read a client handshake
///
/// A wrong magic yields an `InvalidPacket` exception for the server to send
/// back before hanging up.
pub fn read_handshake<R: Read>(reader: &mut R) -> Result<Handshake> {
    let mut header = [0u8; HANDSHAKE_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    if &header[..4] != MAGIC {
        return Err(Exception::invalid_packet("Invalid header.").into());
    }

    let mut buf = &header[4..];
    let database = buf.get_u16_le();
    let password_len = buf.get_u16_le() as usize;

    let mut password = vec![0u8; password_len];
    reader.read_exact(&mut password)?;

    Ok(Handshake {
        database,
        password: Bytes::from(password),
    })
}

/// The single byte accepting a handshake
pub fn encode_accepted() -> Bytes {
    Bytes::from_static(&[ACCEPTED])
}

/// Rejection byte followed by the exception explaining it
pub fn encode_rejected(exception: &Exception) -> Bytes {
    let mut frame = BytesMut::new();
    frame.put_u8(REJECTED);
    put_exception(&mut frame, exception);
    frame.freeze()
}

/// Read the server's answer to a handshake
pub fn read_handshake_reply<R: Read>(reader: &mut R) -> Result<()> {
    let mut status = [0u8; 1];
    reader.read_exact(&mut status)?;
    match status[0] {
        ACCEPTED => Ok(()),
        REJECTED => Err(read_exception(reader)?.into()),
        other => Err(HyperError::Protocol(format!(
            "unknown handshake status 0x{:02x}",
            other
        ))),
    }
}
