//! Engine Module
//!
//! Binds authenticated connections to databases and executes requests.
//!
//! ## Responsibilities
//! - Own the database registry for the lifetime of the server
//! - Check handshake credentials and database indexes
//! - Route each request to the trie, mutex or dispatcher of its database

use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::database::{Database, Registry, SinkId};
use crate::error::Result;
use crate::protocol::{Exception, Handshake, Reply, Request};

/// The request executor shared by every connection
#[derive(Debug)]
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Every database this server exposes
    registry: Registry,
}

impl Engine {
    /// Create an engine with `config.db_count` empty databases
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let registry = Registry::new(config.db_count);
        tracing::debug!("Created {} databases", registry.len());
        Ok(Self { config, registry })
    }

    /// Check a handshake and return the database it binds to
    ///
    /// The password is checked before the index so an unauthenticated peer
    /// cannot probe how many databases exist.
    pub fn authenticate(
        &self,
        handshake: &Handshake,
    ) -> std::result::Result<Arc<Database>, Exception> {
        if !constant_time_eq(&handshake.password, self.config.password.as_bytes()) {
            return Err(Exception::invalid_credentials());
        }
        self.registry
            .get(handshake.database)
            .cloned()
            .ok_or_else(Exception::database_not_found)
    }

    /// Execute a request against a database
    ///
    /// `origin` is the sink of the requesting connection, excluded from the
    /// events it sends. `Lock` blocks the calling thread until the mutex is
    /// acquired.
    pub fn execute(
        &self,
        database: &Database,
        request: Request,
        origin: Option<SinkId>,
    ) -> std::result::Result<Reply, Exception> {
        match request {
            Request::Ping => Ok(Reply::Empty),
            Request::Get { key } => database
                .trie
                .get(&key)
                .map(|view| Reply::Value(view.into_bytes()))
                .ok_or_else(Exception::not_found),
            Request::Delete { key } => Ok(Reply::Flag(database.trie.delete(&key))),
            Request::Set { key, value } => Ok(Reply::Flag(database.trie.set(&key, &value))),
            Request::Clear => {
                database.trie.clear();
                Ok(Reply::Empty)
            }
            Request::DeletePrefix { prefix } => {
                Ok(Reply::Count(database.trie.delete_prefix(&prefix)))
            }
            Request::WalkPrefix { prefix } => {
                let batch = database.trie.scan_prefix(&prefix);
                Ok(Reply::Entries(batch.into_entries()))
            }
            Request::Lock => {
                database.lock.lock();
                Ok(Reply::Empty)
            }
            Request::Unlock => {
                database.lock.unlock()?;
                Ok(Reply::Empty)
            }
            Request::SendEvent { payload } => {
                self.broadcast(database, payload, origin);
                Ok(Reply::Empty)
            }
        }
    }

    fn broadcast(&self, database: &Database, payload: Bytes, origin: Option<SinkId>) {
        let report = database.events.dispatch(payload, origin);
        tracing::trace!(
            "Event on database {}: delivered to {}, dropped for {}",
            database.index(),
            report.delivered,
            report.dropped
        );
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the database registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Look up a database by index
    pub fn database(&self, index: u16) -> Option<&Arc<Database>> {
        self.registry.get(index)
    }
}

/// Compare two secrets in time independent of where they differ
///
/// Length mismatches return early; the length of the secret is not hidden.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
