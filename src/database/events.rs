//! Event dispatcher
//!
//! Fan-out of opaque event payloads to every connection bound to a database.
//!
//! Each connection registers an `EventSink`: the sending half of a bounded
//! queue that the connection drains on its own writer thread. Dispatch only
//! ever does a non-blocking `try_send`, so a stalled connection fills its own
//! queue and starts losing events without slowing the broadcast or the
//! request that triggered it.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::RwLock;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registered sink, used to exclude the sender from its own events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn next() -> Self {
        Self(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Output side of one connection's event queue
#[derive(Debug, Clone)]
pub struct EventSink {
    id: SinkId,
    tx: Sender<Bytes>,
}

impl EventSink {
    /// Create a sink and the receiver its connection drains
    pub fn channel(capacity: usize) -> (Self, Receiver<Bytes>) {
        let (tx, rx) = channel::bounded(capacity);
        (Self { id: SinkId::next(), tx }, rx)
    }

    pub fn id(&self) -> SinkId {
        self.id
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sinks that accepted the event
    pub delivered: usize,
    /// Sinks whose queue was full or already gone
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct EventDispatcher {
    sinks: RwLock<Vec<EventSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's sink
    pub fn add(&self, sink: EventSink) {
        self.sinks.write().push(sink);
    }

    /// Deregister a sink; unknown ids are ignored
    ///
    /// Dropping the sink closes its queue, which ends the connection's event
    /// writer once the remaining events are drained.
    pub fn remove(&self, id: SinkId) {
        let mut sinks = self.sinks.write();
        if let Some(position) = sinks.iter().position(|sink| sink.id == id) {
            sinks.swap_remove(position);
        }
    }

    /// Queue `payload` on every registered sink except `except`
    pub fn dispatch(&self, payload: Bytes, except: Option<SinkId>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let sinks = self.sinks.read();
        for sink in sinks.iter().filter(|sink| Some(sink.id) != except) {
            match sink.tx.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!("Event queue full for sink {:?}, dropping event", sink.id);
                    report.dropped += 1;
                }
                Err(TrySendError::Disconnected(_)) => report.dropped += 1,
            }
        }
        report
    }

    /// Number of registered sinks
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
