//! Network Module
//!
//! TCP server for the HNP protocol.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection reading request frames
//! - One thread per in-flight request, so slow requests (a blocked mutex
//!   lock) never hold up the requests behind them
//! - Requests executed through the Engine

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
