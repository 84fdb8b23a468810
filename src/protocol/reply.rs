//! Reply definitions
//!
//! Represents successful replies to clients. Failures are `Exception`s.

use bytes::Bytes;

/// Reply status byte following the correlation id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Exception = 0x01,
}

/// Success payload layouts
///
/// The layout is fixed per opcode and is not announced on the wire, so the
/// receiving side must know which request a reply answers before decoding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// Nothing after the status byte
    Empty,
    /// `u32` length followed by the value
    Value,
    /// A single `0`/`1` byte
    Flag,
    /// A `u64`
    Count,
    /// `u32` count followed by `{u32 klen, key, u32 vlen, value}` records
    Entries,
}

/// A successful reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Empty,
    Value(Bytes),
    Flag(bool),
    Count(u64),
    Entries(Vec<(Bytes, Bytes)>),
}

impl Reply {
    pub fn shape(&self) -> ReplyShape {
        match self {
            Reply::Empty => ReplyShape::Empty,
            Reply::Value(_) => ReplyShape::Value,
            Reply::Flag(_) => ReplyShape::Flag,
            Reply::Count(_) => ReplyShape::Count,
            Reply::Entries(_) => ReplyShape::Entries,
        }
    }
}
