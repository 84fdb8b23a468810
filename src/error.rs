//! Error types for HyperCache
//!
//! Provides a unified error type for all fallible operations. The trie itself
//! never fails; errors come from sockets, framing and server-side exceptions.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::{Exception, ExceptionKind};

/// Result type alias using HyperError
pub type Result<T> = std::result::Result<T, HyperError>;

/// Unified error type for HyperCache operations
#[derive(Debug, Error)]
pub enum HyperError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// An exception frame sent by the remote side
    #[error("{0}")]
    Exception(#[from] Exception),

    /// The peer sent bytes that do not form a valid frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    /// The connection is gone; carries the error that closed it
    #[error("Connection closed: {0}")]
    ConnectionClosed(Arc<HyperError>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HyperError {
    /// The exception kind, if this error came from an exception frame
    pub fn exception_kind(&self) -> Option<&ExceptionKind> {
        match self {
            HyperError::Exception(exception) => Some(&exception.kind),
            _ => None,
        }
    }

    /// The io error kind behind this error, looking through a closed connection
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            HyperError::Io(e) => Some(e.kind()),
            HyperError::ConnectionClosed(cause) => cause.io_kind(),
            _ => None,
        }
    }

    /// True if the server reported the key as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self.exception_kind(), Some(ExceptionKind::NotFound))
    }
}
