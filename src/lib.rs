//! # HyperCache
//!
//! An in-memory, multi-database key/value cache with:
//! - A radix trie per database supporting prefix walks and prefix deletes
//! - HNP, a multiplexed binary request/reply protocol with server-pushed events
//! - A per-database advisory mutex and event fan-out shared over the protocol
//! - A blocking, thread-safe client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │           (thread per connection, thread per request)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ handshake binds one database
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │              (auth + request execution)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          │            │                 │
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │ RadixTrie   │ │ Advisory    │ │   Event     │
//!   │  (RwLock)   │ │   Mutex     │ │ Dispatcher  │
//!   └─────────────┘ └─────────────┘ └─────────────┘
//!          one triple per database in the Registry
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod trie;
pub mod database;
pub mod protocol;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::{Client, ClientOptions, ClientState};
pub use config::Config;
pub use engine::Engine;
pub use error::{HyperError, Result};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of HyperCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
