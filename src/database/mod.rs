//! Database Module
//!
//! A database is one independent keyspace plus the coordination primitives
//! that clients share through it.
//!
//! ```text
//! Registry
//!   ├── Database 0 ── { RadixTrie, AdvisoryMutex, EventDispatcher }
//!   ├── Database 1 ── { RadixTrie, AdvisoryMutex, EventDispatcher }
//!   └── ...
//! ```

mod events;
mod mutex;
mod registry;

pub use events::{DispatchReport, EventDispatcher, EventSink, SinkId};
pub use mutex::{AdvisoryMutex, UnlockError};
pub use registry::Registry;

use crate::trie::RadixTrie;

#[derive(Debug)]
pub struct Database {
    index: u16,

    /// Records
    pub trie: RadixTrie,

    /// Lock toggled by the mutex opcodes
    pub lock: AdvisoryMutex,

    /// Sinks of every connection bound to this database
    pub events: EventDispatcher,
}

impl Database {
    pub fn new(index: u16) -> Self {
        Self {
            index,
            trie: RadixTrie::new(),
            lock: AdvisoryMutex::new(),
            events: EventDispatcher::new(),
        }
    }

    pub fn index(&self) -> u16 {
        self.index
    }
}
