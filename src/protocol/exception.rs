//! Exception definitions
//!
//! Exceptions travel on the wire as a name and a description, each prefixed
//! by a one-byte length. Known names map onto `ExceptionKind` variants; any
//! other name is preserved in `ExceptionKind::Other`.

use std::fmt;

/// Kinds of exception a peer can raise
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Malformed framing or unknown opcode
    InvalidPacket,
    /// Missing key on get
    NotFound,
    /// Unlock of an unlocked mutex
    UnlockError,
    /// Handshake password mismatch
    InvalidCredentials,
    /// Handshake database index out of range
    DatabaseNotFound,
    /// Any name this side does not recognize
    Other(String),
}

impl ExceptionKind {
    /// Wire name
    pub fn name(&self) -> &str {
        match self {
            ExceptionKind::InvalidPacket => "InvalidPacket",
            ExceptionKind::NotFound => "NotFound",
            ExceptionKind::UnlockError => "UnlockError",
            ExceptionKind::InvalidCredentials => "InvalidCredentials",
            ExceptionKind::DatabaseNotFound => "DatabaseNotFound",
            ExceptionKind::Other(name) => name,
        }
    }

    /// Parse a wire name
    pub fn from_name(name: &str) -> Self {
        match name {
            "InvalidPacket" => ExceptionKind::InvalidPacket,
            "NotFound" => ExceptionKind::NotFound,
            "UnlockError" => ExceptionKind::UnlockError,
            "InvalidCredentials" => ExceptionKind::InvalidCredentials,
            "DatabaseNotFound" => ExceptionKind::DatabaseNotFound,
            other => ExceptionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception as carried by an exception frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub description: String,
}

impl Exception {
    pub fn new(kind: ExceptionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn invalid_packet(description: impl Into<String>) -> Self {
        Self::new(ExceptionKind::InvalidPacket, description)
    }

    pub fn not_found() -> Self {
        Self::new(
            ExceptionKind::NotFound,
            "The key was not found in the database.",
        )
    }

    pub fn unlock_error() -> Self {
        Self::new(ExceptionKind::UnlockError, "Mutex was already unlocked.")
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            ExceptionKind::InvalidCredentials,
            "The specified password is invalid.",
        )
    }

    pub fn database_not_found() -> Self {
        Self::new(
            ExceptionKind::DatabaseNotFound,
            "The database index is too large for the number of databases in this application.",
        )
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)
    }
}

impl std::error::Error for Exception {}

impl From<crate::database::UnlockError> for Exception {
    fn from(_: crate::database::UnlockError) -> Self {
        Exception::unlock_error()
    }
}
