//! HyperCache Server Binary
//!
//! Starts the HNP server.

use std::sync::Arc;

use clap::Parser;
use hypercache::network::Server;
use hypercache::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// HyperCache Server
#[derive(Parser, Debug)]
#[command(name = "hypercache-server")]
#[command(about = "In-memory radix-trie cache served over HNP")]
#[command(version)]
struct Args {
    /// Listen address for HNP (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6060")]
    listen: String,

    /// Number of databases
    #[arg(short, long, default_value = "10")]
    db_count: usize,

    /// Shared secret clients must present
    #[arg(short, long, default_value = "")]
    password: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Deadline for reading a request body (milliseconds)
    #[arg(long, default_value = "2000")]
    read_timeout_ms: u64,

    /// Deadline for writing a frame (milliseconds)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hypercache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("HyperCache Server v{}", hypercache::VERSION);
    tracing::info!("Databases: {}", args.db_count);
    tracing::info!("Listen address: {}", args.listen);
    if args.password.is_empty() {
        tracing::warn!("No password set; any client can connect");
    }

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .db_count(args.db_count)
        .password(args.password)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to start engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
