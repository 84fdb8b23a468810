//! Connection Handler
//!
//! Handles individual HNP client connections.
//!
//! ## Threads per connection
//! - the connection thread runs the handshake, then reads request frames
//! - every request runs on its own thread and writes its own reply
//! - one event thread drains the connection's event queue
//!
//! All of them share a `FrameWriter`, which writes each frame whole under a
//! mutex so replies and events never interleave on the wire.

use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use crate::database::{Database, EventSink, SinkId};
use crate::engine::Engine;
use crate::error::{HyperError, Result};
use crate::protocol::{self, Opcode};

/// Serialized writes of whole frames to one socket
pub(crate) struct FrameWriter {
    writer: Mutex<BufWriter<TcpStream>>,

    /// Separate handle so the socket can be shut down while a write is stuck
    control: TcpStream,
}

impl FrameWriter {
    fn new(stream: TcpStream) -> Result<Self> {
        let control = stream.try_clone()?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(stream)),
            control,
        })
    }

    /// Write and flush one complete frame
    fn write(&self, frame: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        protocol::write_frame(&mut *writer, frame)
    }

    /// Write and flush one event frame
    fn write_event(&self, payload: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(&protocol::event_header(payload.len()))?;
        writer.write_all(payload)?;
        writer.flush()?;
        Ok(())
    }

    /// Close both directions, unblocking the connection's reader
    fn shutdown(&self) {
        let _ = self.control.shutdown(Shutdown::Both);
    }
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// Frame writer shared with request and event threads
    writer: Arc<FrameWriter>,

    /// Reference to the request engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and configures the write timeout
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_write_timeout(engine.config().write_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let writer = FrameWriter::new(stream)?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: Arc::new(writer),
            engine,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Runs the handshake, then serves requests until the client disconnects
    /// or an error occurs. The socket is shut down on return.
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = match self.handshake() {
            Ok(Some(database)) => self.serve_bound(database),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        self.writer.shutdown();
        result
    }

    /// Run the handshake; `None` means the client was rejected
    fn handshake(&mut self) -> Result<Option<Arc<Database>>> {
        self.reader
            .get_ref()
            .set_read_timeout(self.engine.config().handshake_timeout())?;

        let handshake = match protocol::read_handshake(&mut self.reader) {
            Ok(handshake) => handshake,
            Err(HyperError::Exception(exception)) => {
                tracing::debug!("Bad handshake from {}: {}", self.peer_addr, exception);
                self.writer.write(&protocol::encode_rejected(&exception))?;
                return Ok(None);
            }
            Err(e) => return self.disconnected(e).map(|_| None),
        };

        match self.engine.authenticate(&handshake) {
            Ok(database) => {
                self.writer.write(&protocol::encode_accepted())?;
                tracing::debug!(
                    "Client {} bound to database {}",
                    self.peer_addr,
                    database.index()
                );
                Ok(Some(database))
            }
            Err(exception) => {
                tracing::warn!("Rejected handshake from {}: {}", self.peer_addr, exception);
                self.writer.write(&protocol::encode_rejected(&exception))?;
                Ok(None)
            }
        }
    }

    /// Register for events, serve requests, then deregister
    fn serve_bound(&mut self, database: Arc<Database>) -> Result<()> {
        let (sink, events) = EventSink::channel(self.engine.config().event_queue_capacity);
        let sink_id = sink.id();
        database.events.add(sink);

        let pump = spawn_event_pump(Arc::clone(&self.writer), events, self.peer_addr.clone());
        let result = match pump {
            Ok(_) => self.serve(&database, sink_id),
            Err(e) => Err(e),
        };

        // Dropping the sink closes the queue and ends the event thread
        database.events.remove(sink_id);
        result
    }

    /// Read request frames in a loop, dispatching each to its own thread
    fn serve(&mut self, database: &Arc<Database>, sink_id: SinkId) -> Result<()> {
        let config = self.engine.config().clone();

        loop {
            // Wait for the next header
            self.reader.get_ref().set_read_timeout(config.idle_timeout())?;
            let header = match protocol::read_request_header(&mut self.reader) {
                Ok(header) => header,
                Err(e) => return self.disconnected(e),
            };

            if let Err(e) = header.validate(config.max_payload_size) {
                tracing::warn!("Malformed frame from {}: {}", self.peer_addr, e);
                return Err(e);
            }

            // The body must follow promptly
            self.reader.get_ref().set_read_timeout(config.read_timeout())?;
            let body = match protocol::read_body(&mut self.reader, header.body_len) {
                Ok(body) => body,
                Err(e) => return self.disconnected(e),
            };

            tracing::trace!(
                "Received request {} ({} bytes) from {}",
                header.correlation_id,
                header.body_len,
                self.peer_addr
            );

            let task = RequestTask {
                engine: Arc::clone(&self.engine),
                database: Arc::clone(database),
                writer: Arc::clone(&self.writer),
                correlation_id: header.correlation_id,
                body,
                origin: sink_id,
            };
            thread::Builder::new()
                .name(format!("hnp-request-{}", header.correlation_id))
                .spawn(move || task.run())?;
        }
    }

    /// Classify a read error: a vanished peer is a normal end of connection
    fn disconnected(&self, error: HyperError) -> Result<()> {
        if let HyperError::Io(ref io_err) = error {
            match io_err.kind() {
                ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                // Read timeout (Windows uses TimedOut instead of WouldBlock)
                ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                _ => {}
            }
        }
        tracing::warn!("Error reading from {}: {}", self.peer_addr, error);
        Err(error)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// One request, executed off the connection's reader thread
struct RequestTask {
    engine: Arc<Engine>,
    database: Arc<Database>,
    writer: Arc<FrameWriter>,
    correlation_id: u32,
    body: Bytes,
    origin: SinkId,
}

impl RequestTask {
    fn run(self) {
        let mut acquired_lock = false;
        let outcome = protocol::decode_request(self.body).and_then(|request| {
            let is_lock = request.opcode() == Opcode::Lock;
            let outcome = self
                .engine
                .execute(&self.database, request, Some(self.origin));
            acquired_lock = is_lock && outcome.is_ok();
            outcome
        });

        let frame = protocol::encode_reply(self.correlation_id, &outcome);
        if let Err(e) = self.writer.write(&frame) {
            tracing::debug!("Failed to send reply {}: {}", self.correlation_id, e);

            // Nobody learned they hold the lock, so give it back
            if acquired_lock && self.database.lock.unlock().is_ok() {
                tracing::debug!(
                    "Released undeliverable lock on database {}",
                    self.database.index()
                );
            }
            self.writer.shutdown();
        }
    }
}

/// Start the thread that writes queued events to the socket
fn spawn_event_pump(
    writer: Arc<FrameWriter>,
    events: Receiver<Bytes>,
    peer_addr: String,
) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("hnp-events".to_string())
        .spawn(move || {
            for payload in events.iter() {
                if let Err(e) = writer.write_event(&payload) {
                    tracing::debug!("Failed to send event to {}: {}", peer_addr, e);
                    writer.shutdown();
                    break;
                }
            }
        })?;
    Ok(handle)
}
