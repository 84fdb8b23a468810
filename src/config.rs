//! Configuration for HyperCache
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{HyperError, Result};
use crate::protocol::MAX_PAYLOAD_SIZE;

/// Main configuration for a HyperCache server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Database Configuration
    // -------------------------------------------------------------------------
    /// Number of independent databases, addressed by index `0..db_count`
    pub db_count: usize,

    /// Shared secret every HNP handshake must present
    pub password: String,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address for HNP
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Deadline for reading a request body once its header arrived (milliseconds)
    pub read_timeout_ms: u64,

    /// Deadline for writing a single frame (milliseconds)
    pub write_timeout_ms: u64,

    /// Deadline for the whole handshake exchange (milliseconds)
    pub handshake_timeout_ms: u64,

    /// Deadline for waiting on the next request header (milliseconds, 0 = none)
    pub idle_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Largest request payload accepted before the connection is dropped
    pub max_payload_size: u32,

    /// Events buffered per connection before new ones are dropped
    pub event_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_count: 10,
            password: String::new(),
            listen_addr: "127.0.0.1:6060".to_string(),
            max_connections: 1024,
            read_timeout_ms: 2000,
            write_timeout_ms: 5000,
            handshake_timeout_ms: 10_000,
            idle_timeout_ms: 0,
            max_payload_size: MAX_PAYLOAD_SIZE,
            event_queue_capacity: 256,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values are usable before starting a server
    pub fn validate(&self) -> Result<()> {
        if self.db_count == 0 {
            return Err(HyperError::Config("db_count must be at least 1".to_string()));
        }
        // Database indexes travel as u16 on the wire
        if self.db_count > u16::MAX as usize + 1 {
            return Err(HyperError::Config(format!(
                "db_count {} exceeds the {} addressable databases",
                self.db_count,
                u16::MAX as usize + 1
            )));
        }
        if self.password.len() > u16::MAX as usize {
            return Err(HyperError::Config(
                "password does not fit the handshake length field".to_string(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(HyperError::Config(
                "event_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_payload_size == 0 {
            return Err(HyperError::Config(
                "max_payload_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub(crate) fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    pub(crate) fn handshake_timeout(&self) -> Option<Duration> {
        millis(self.handshake_timeout_ms)
    }

    pub(crate) fn idle_timeout(&self) -> Option<Duration> {
        millis(self.idle_timeout_ms)
    }
}

/// Zero means "no deadline" for socket timeouts
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of databases
    pub fn db_count(mut self, count: usize) -> Self {
        self.config.db_count = count;
        self
    }

    /// Set the shared secret
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the handshake timeout (in milliseconds)
    pub fn handshake_timeout_ms(mut self, ms: u64) -> Self {
        self.config.handshake_timeout_ms = ms;
        self
    }

    /// Set the idle timeout between requests (in milliseconds, 0 disables it)
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    /// Set the largest accepted request payload (in bytes)
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set how many events may queue per connection
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.event_queue_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
