//! tips CLI
//!
//! Command-line front end for the tips broker.
//!
//! # Commands
//!
//! - `serve` - Run a broker behind the line-delimited JSON listener
//! - `call` - Send one request to a running server and print the reply
//! - `demo` - Walk through publish, pull, ack and snapshot replay in-process

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// tips message broker tools.
#[derive(Parser)]
#[command(name = "tips")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the broker server
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:9494")]
        bind: SocketAddr,

        /// Maximum concurrent connections
        #[arg(long, default_value = "1000")]
        max_connections: usize,

        /// Pull timeout in seconds when a request gives none
        #[arg(long, default_value = "1")]
        default_timeout: f64,

        /// Upper bound in seconds on any pull timeout
        #[arg(long, default_value = "30")]
        max_timeout: f64,

        /// Upper bound on messages returned by one pull
        #[arg(long, default_value = "1000")]
        max_pull_limit: usize,
    },

    /// Send one JSON request line to a running server
    Call {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:9494")]
        addr: SocketAddr,

        /// Request, e.g. '{"op":"create_topic","topic":"t1"}'
        request: String,
    },

    /// Run an in-process walkthrough of the broker
    Demo {
        /// Number of messages to publish
        #[arg(short, long, default_value = "10")]
        messages: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            max_connections,
            default_timeout,
            max_timeout,
            max_pull_limit,
        } => {
            let options = commands::serve::ServeOptions {
                bind,
                max_connections,
                default_timeout,
                max_timeout,
                max_pull_limit,
            };
            commands::serve::run(&options)?;
        }
        Commands::Call { addr, request } => {
            commands::call::run(addr, &request)?;
        }
        Commands::Demo { messages, format } => {
            commands::demo::run(messages, &format)?;
        }
        Commands::Version => {
            println!("tips CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("tips core v{}", tips_core::VERSION);
        }
    }

    Ok(())
}
