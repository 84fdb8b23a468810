//! HyperCache CLI Client
//!
//! Command-line interface for interacting with a HyperCache server.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hypercache::{Client, HyperError};

/// HyperCache CLI
#[derive(Parser, Debug)]
#[command(name = "hypercache-cli")]
#[command(about = "CLI for the HyperCache key-value cache")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6060")]
    server: String,

    /// Database index
    #[arg(short, long, default_value = "0")]
    db: u16,

    /// Shared secret
    #[arg(short, long, default_value = "")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Delete every key under a prefix
    DelPrefix {
        /// The prefix to delete
        prefix: String,
    },

    /// List every key under a prefix
    Scan {
        /// The prefix to list (empty lists everything)
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Delete every key in the database
    Clear,

    /// Acquire the database mutex
    Lock,

    /// Release the database mutex
    Unlock,

    /// Send an event to the other clients of the database
    Event {
        /// The event payload
        payload: String,
    },

    /// Print events as they arrive
    Listen,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let client = match Client::connect(&args.server, &args.password, args.db) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_found() => {
            println!("(not found)");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(client: &Client, command: Commands) -> Result<(), HyperError> {
    match command {
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Get { key } => {
            let value = client.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { key, value } => {
            let existed = client.set(key.as_bytes(), value.as_bytes())?;
            println!("{}", if existed { "replaced" } else { "created" });
        }
        Commands::Del { key } => {
            let existed = client.delete(key.as_bytes())?;
            println!("{}", if existed { "deleted" } else { "(not found)" });
        }
        Commands::DelPrefix { prefix } => {
            let removed = client.delete_prefix(prefix.as_bytes())?;
            println!("{} removed", removed);
        }
        Commands::Scan { prefix } => {
            for (key, value) in client.walk_prefix(prefix.as_bytes())? {
                println!(
                    "{} = {}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
        Commands::Clear => {
            client.clear()?;
            println!("OK");
        }
        Commands::Lock => {
            client.lock()?;
            println!("locked");
        }
        Commands::Unlock => {
            client.unlock()?;
            println!("unlocked");
        }
        Commands::Event { payload } => {
            client.send_event(payload.as_bytes())?;
            println!("OK");
        }
        Commands::Listen => {
            let events = client.subscribe();
            for event in events.iter() {
                println!("{}", String::from_utf8_lossy(&event));
            }
            if let Some(e) = client.last_error() {
                return Err(e);
            }
        }
    }
    Ok(())
}
