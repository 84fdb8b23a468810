//! Request definitions
//!
//! Represents requests from clients.

use bytes::Bytes;

use super::ReplyShape;

/// Opcodes, the first byte of every request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Ping = 0,
    Get = 1,
    Delete = 2,
    Set = 3,
    Clear = 4,
    DeletePrefix = 5,
    WalkPrefix = 6,
    Lock = 7,
    Unlock = 8,
    SendEvent = 9,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Ok(match byte {
            0 => Opcode::Ping,
            1 => Opcode::Get,
            2 => Opcode::Delete,
            3 => Opcode::Set,
            4 => Opcode::Clear,
            5 => Opcode::DeletePrefix,
            6 => Opcode::WalkPrefix,
            7 => Opcode::Lock,
            8 => Opcode::Unlock,
            9 => Opcode::SendEvent,
            other => return Err(other),
        })
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Health check
    Ping,

    /// Get a value by key
    Get { key: Bytes },

    /// Delete a key
    Delete { key: Bytes },

    /// Insert or replace a key-value pair
    Set { key: Bytes, value: Bytes },

    /// Remove every record in the database
    Clear,

    /// Remove every record under a prefix
    DeletePrefix { prefix: Bytes },

    /// List every record under a prefix
    WalkPrefix { prefix: Bytes },

    /// Acquire the database mutex (blocks until free)
    Lock,

    /// Release the database mutex
    Unlock,

    /// Broadcast a payload to the other connections on the database
    SendEvent { payload: Bytes },
}

impl Request {
    /// Get the opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Ping => Opcode::Ping,
            Request::Get { .. } => Opcode::Get,
            Request::Delete { .. } => Opcode::Delete,
            Request::Set { .. } => Opcode::Set,
            Request::Clear => Opcode::Clear,
            Request::DeletePrefix { .. } => Opcode::DeletePrefix,
            Request::WalkPrefix { .. } => Opcode::WalkPrefix,
            Request::Lock => Opcode::Lock,
            Request::Unlock => Opcode::Unlock,
            Request::SendEvent { .. } => Opcode::SendEvent,
        }
    }

    /// Layout of the success payload the server answers this request with
    pub fn reply_shape(&self) -> ReplyShape {
        match self.opcode() {
            Opcode::Get => ReplyShape::Value,
            Opcode::Delete | Opcode::Set => ReplyShape::Flag,
            Opcode::DeletePrefix => ReplyShape::Count,
            Opcode::WalkPrefix => ReplyShape::Entries,
            Opcode::Ping | Opcode::Clear | Opcode::Lock | Opcode::Unlock | Opcode::SendEvent => {
                ReplyShape::Empty
            }
        }
    }
}
