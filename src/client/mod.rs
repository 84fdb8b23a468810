//! Client Module
//!
//! Multiplexing HNP client.
//!
//! ## Lifecycle
//! ```text
//! Connecting ──► Handshaking ──► Ready ──► Closed
//! ```
//!
//! A `Client` may be shared between threads: every call gets its own
//! correlation id and blocks only the calling thread until its reply arrives.
//! A background reader thread routes replies to their callers and events to
//! listeners. When the connection fails, every waiting call returns the error
//! that closed it.

mod shared;

use std::io::{self, BufReader};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{HyperError, Result};
use crate::protocol::{self, Handshake, Reply, Request};
use shared::{Pending, Shared};

/// Connection state of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientState {
    Connecting = 0,
    Handshaking = 1,
    Ready = 2,
    Closed = 3,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClientState::Connecting,
            1 => ClientState::Handshaking,
            2 => ClientState::Ready,
            _ => ClientState::Closed,
        }
    }
}

/// Client tuning knobs
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long to wait for the server to answer the handshake
    pub handshake_timeout: Duration,

    /// Deadline for writing one request frame
    pub write_timeout: Duration,

    /// Events buffered per `subscribe` receiver before new ones are dropped
    pub event_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(5),
            event_capacity: 128,
        }
    }
}

/// A connection to an HNP server bound to one database
pub struct Client {
    shared: Arc<Shared>,
    options: ClientOptions,
}

impl Client {
    /// Connect to `addr` and bind to database `db`
    pub fn connect<A: ToSocketAddrs>(addr: A, password: &str, db: u16) -> Result<Self> {
        Self::connect_with(addr, password, db, ClientOptions::default())
    }

    /// Connect with explicit options
    pub fn connect_with<A: ToSocketAddrs>(
        addr: A,
        password: &str,
        db: u16,
        options: ClientOptions,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream, password, db, options)
    }

    /// Run the handshake over an already connected socket
    pub fn from_stream(
        stream: TcpStream,
        password: &str,
        db: u16,
        options: ClientOptions,
    ) -> Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(options.write_timeout))?;

        let shared = Arc::new(Shared::new(stream.try_clone()?)?);
        shared.set_state(ClientState::Handshaking);

        let handshake = Handshake::new(db, Bytes::copy_from_slice(password.as_bytes()));
        shared.write_frame(&handshake.encode()?)?;

        stream.set_read_timeout(Some(options.handshake_timeout))?;
        let mut reader = BufReader::new(stream);
        if let Err(e) = protocol::read_handshake_reply(&mut reader) {
            // The caller gets the rejection itself, not a closed-connection error
            shared.set_state(ClientState::Closed);
            shared.shutdown_socket();
            return Err(e);
        }
        // Replies may take arbitrarily long (a blocked lock), so no deadline
        reader.get_ref().set_read_timeout(None)?;

        shared.set_state(ClientState::Ready);
        tracing::debug!("Connected to database {}", db);

        let reader_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("hnp-client-reader".to_string())
            .spawn(move || reader_shared.read_loop(reader))?;

        Ok(Self { shared, options })
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Check the server is answering
    pub fn ping(&self) -> Result<()> {
        self.call(Request::Ping).map(|_| ())
    }

    /// Get a value; a missing key is an error for which `is_not_found` holds
    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        match self.call(Request::Get { key: Bytes::copy_from_slice(key) })? {
            Reply::Value(value) => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    /// Insert or replace a record; returns whether the key already existed
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let request = Request::Set {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        };
        self.call_flag(request)
    }

    /// Delete a record; returns whether it existed
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        self.call_flag(Request::Delete { key: Bytes::copy_from_slice(key) })
    }

    /// Remove every record in the database
    pub fn clear(&self) -> Result<()> {
        self.call(Request::Clear).map(|_| ())
    }

    /// Remove every record under `prefix`; returns how many were removed
    pub fn delete_prefix(&self, prefix: &[u8]) -> Result<u64> {
        match self.call(Request::DeletePrefix { prefix: Bytes::copy_from_slice(prefix) })? {
            Reply::Count(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// List every record under `prefix`, in the order the server sent them
    pub fn walk_prefix(&self, prefix: &[u8]) -> Result<Vec<(Bytes, Bytes)>> {
        match self.call(Request::WalkPrefix { prefix: Bytes::copy_from_slice(prefix) })? {
            Reply::Entries(entries) => Ok(entries),
            other => Err(unexpected(other)),
        }
    }

    // =========================================================================
    // Coordination
    // =========================================================================

    /// Acquire the database mutex, blocking until it is free
    pub fn lock(&self) -> Result<()> {
        self.call(Request::Lock).map(|_| ())
    }

    /// Release the database mutex
    pub fn unlock(&self) -> Result<()> {
        self.call(Request::Unlock).map(|_| ())
    }

    /// Broadcast `payload` to the other connections on this database
    pub fn send_event(&self, payload: &[u8]) -> Result<()> {
        self.call(Request::SendEvent { payload: Bytes::copy_from_slice(payload) })
            .map(|_| ())
    }

    /// Receive events from now on through a bounded queue
    ///
    /// When the queue is full, new events are dropped for this receiver.
    pub fn subscribe(&self) -> Receiver<Bytes> {
        let (tx, rx) = channel::bounded(self.options.event_capacity);
        self.shared.add_listener(tx);
        rx
    }

    /// Deliver events to an existing sender; full senders miss events
    pub fn add_event_listener(&self, listener: Sender<Bytes>) {
        self.shared.add_listener(listener);
    }

    // =========================================================================
    // Connection
    // =========================================================================

    pub fn state(&self) -> ClientState {
        self.shared.state()
    }

    /// The error that closed the connection, if it is closed
    pub fn last_error(&self) -> Option<HyperError> {
        self.shared.closed_error()
    }

    /// Close the connection, failing any request still waiting
    pub fn close(&self) {
        self.shared.fail(closed_locally("connection closed by client"));
    }

    /// Send one request and wait for its reply
    fn call(&self, request: Request) -> Result<Reply> {
        let (tx, rx) = channel::bounded(1);
        let shape = request.reply_shape();
        let id = self.shared.register(Pending { shape, tx })?;

        let frame = protocol::encode_request(id, &request);
        if let Err(e) = self.shared.write_frame(&frame) {
            self.shared.unregister(id);
            self.shared.fail(e);
            return Err(self.connection_error());
        }

        match rx.recv() {
            Ok(completion) => {
                let reply = completion?;
                if reply.shape() != shape {
                    return Err(unexpected(reply));
                }
                Ok(reply)
            }
            Err(_) => Err(self.connection_error()),
        }
    }

    fn call_flag(&self, request: Request) -> Result<bool> {
        match self.call(request)? {
            Reply::Flag(flag) => Ok(flag),
            other => Err(unexpected(other)),
        }
    }

    fn connection_error(&self) -> HyperError {
        self.shared
            .closed_error()
            .unwrap_or_else(|| {
                HyperError::ConnectionClosed(Arc::new(closed_locally("connection closed")))
            })
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shared.fail(closed_locally("client dropped"));
    }
}

/// Cause recorded when this side ends the connection
fn closed_locally(reason: &str) -> HyperError {
    HyperError::Io(io::Error::new(io::ErrorKind::ConnectionAborted, reason.to_string()))
}

fn unexpected(reply: Reply) -> HyperError {
    HyperError::Protocol(format!("unexpected reply {:?}", reply.shape()))
}
