//! State shared between a client's callers and its reader thread

use std::collections::HashMap;
use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::{Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use super::ClientState;
use crate::error::{HyperError, Result};
use crate::protocol::{
    self, Exception, Reply, ReplyShape, Status, EVENT_CORRELATION_ID, EVENT_MARKER,
};

/// Outcome handed from the reader thread to the waiting caller
pub(crate) type Completion = std::result::Result<Reply, Exception>;

/// A request waiting for its reply
pub(crate) struct Pending {
    pub(crate) shape: ReplyShape,
    pub(crate) tx: Sender<Completion>,
}

pub(crate) struct Shared {
    writer: Mutex<TcpStream>,

    /// Separate handle so the socket can be shut down while a write is stuck
    control: TcpStream,

    pending: Mutex<HashMap<u32, Pending>>,
    listeners: Mutex<Vec<Sender<Bytes>>>,
    last_error: RwLock<Option<Arc<HyperError>>>,
    next_id: AtomicU32,
    state: AtomicU8,
}

impl Shared {
    pub(crate) fn new(stream: TcpStream) -> Result<Self> {
        let control = stream.try_clone()?;
        Ok(Self {
            writer: Mutex::new(stream),
            control,
            pending: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            last_error: RwLock::new(None),
            next_id: AtomicU32::new(0),
            state: AtomicU8::new(ClientState::Connecting as u8),
        })
    }

    pub(crate) fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ClientState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Next correlation id; wraps around but never yields the event id 0
    fn next_correlation_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if id != EVENT_CORRELATION_ID {
                return id;
            }
        }
    }

    /// Allocate a correlation id and register its completion
    ///
    /// Ids still waiting for a reply are skipped after the counter wraps.
    /// Fails if the connection is already closed.
    pub(crate) fn register(&self, pending: Pending) -> Result<u32> {
        let mut map = self.pending.lock();
        if let Some(error) = self.closed_error() {
            return Err(error);
        }
        let id = loop {
            let id = self.next_correlation_id();
            if !map.contains_key(&id) {
                break id;
            }
        };
        map.insert(id, pending);
        Ok(id)
    }

    pub(crate) fn unregister(&self, id: u32) {
        self.pending.lock().remove(&id);
    }

    pub(crate) fn write_frame(&self, frame: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(frame)?;
        writer.flush()?;
        Ok(())
    }

    /// Listeners added after close are dropped at once, ending their receivers
    pub(crate) fn add_listener(&self, listener: Sender<Bytes>) {
        let mut listeners = self.listeners.lock();
        if self.closed_error().is_none() {
            listeners.push(listener);
        }
    }

    /// The error that closed the connection, if it is closed
    pub(crate) fn closed_error(&self) -> Option<HyperError> {
        self.last_error
            .read()
            .as_ref()
            .map(|cause| HyperError::ConnectionClosed(Arc::clone(cause)))
    }

    /// Close the connection and fail every pending request
    ///
    /// Only the first error is recorded.
    pub(crate) fn fail(&self, error: HyperError) {
        let reason = error.to_string();
        {
            let mut last_error = self.last_error.write();
            if last_error.is_none() {
                *last_error = Some(Arc::new(error));
            }
        }
        self.set_state(ClientState::Closed);
        self.shutdown_socket();

        // Dropping the senders wakes every waiter with a disconnect
        let drained = std::mem::take(&mut *self.pending.lock());
        if !drained.is_empty() {
            tracing::debug!("Failing {} pending requests: {}", drained.len(), reason);
        }
        drop(drained);

        // Disconnect event receivers so their iterators end
        self.listeners.lock().clear();
    }

    /// Close both directions, unblocking the reader thread
    pub(crate) fn shutdown_socket(&self) {
        let _ = self.control.shutdown(Shutdown::Both);
    }

    // =========================================================================
    // Reader thread
    // =========================================================================

    /// Decode frames until the connection fails
    pub(crate) fn read_loop(&self, mut reader: BufReader<TcpStream>) {
        let error = loop {
            if let Err(e) = self.read_frame(&mut reader) {
                break e;
            }
        };
        tracing::debug!("Client reader stopped: {}", error);
        self.fail(error);
    }

    fn read_frame(&self, reader: &mut BufReader<TcpStream>) -> Result<()> {
        let (correlation_id, status) = protocol::read_reply_header(reader)?;

        if correlation_id == EVENT_CORRELATION_ID {
            if status != EVENT_MARKER {
                // Reserved frame type; skip the marker and carry on
                tracing::trace!("Ignoring frame with reserved marker 0x{:02x}", status);
                return Ok(());
            }
            let payload = protocol::read_event_payload(reader)?;
            self.deliver_event(payload);
            return Ok(());
        }

        let Some(pending) = self.pending.lock().remove(&correlation_id) else {
            // Without the request we cannot know the payload layout
            return Err(HyperError::Protocol(format!(
                "reply for unknown correlation id {}",
                correlation_id
            )));
        };

        let completion = match status {
            s if s == Status::Ok as u8 => {
                protocol::read_reply_payload(reader, pending.shape).map(Ok)
            }
            s if s == Status::Exception as u8 => protocol::read_exception(reader).map(Err),
            other => Err(HyperError::Protocol(format!(
                "unknown reply status 0x{:02x}",
                other
            ))),
        };

        match completion {
            Ok(completion) => {
                // The caller may have given up; nothing to do then
                let _ = pending.tx.send(completion);
                Ok(())
            }
            Err(e) => {
                // Put the caller back so it is failed with this error
                self.pending.lock().insert(correlation_id, pending);
                Err(e)
            }
        }
    }

    /// Offer an event to every listener without blocking
    ///
    /// Full listeners miss the event; dropped listeners are forgotten.
    fn deliver_event(&self, payload: Bytes) {
        self.listeners
            .lock()
            .retain(|listener| match listener.try_send(payload.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!("Event listener full, dropping event");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}
