//! # tips server
//!
//! Network front end for the tips broker.
//!
//! This crate provides:
//! - A newline-delimited JSON protocol covering every broker operation
//! - Status codes mapped from broker error categories
//! - A tokio TCP listener with a connection limit and graceful shutdown
//!
//! # Protocol
//!
//! One request per line, tagged by `op`:
//!
//! ```text
//! {"op":"publish","topic":"t1","messages":["a","b"]}
//! {"status":200,"body":["0","1"]}
//! {"op":"pull","topic":"t1","subscription":"s1","limit":2,"timeout":5}
//! {"status":200,"body":{"messages":[...],"next_offset":2}}
//! ```
//!
//! Errors carry `{"error": "..."}` bodies with 400 (invalid argument),
//! 404 (not found), 409 (already exists) or 500 (internal).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
pub mod listener;
mod protocol;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use protocol::{
    parse_id, Request, Response, WireMessage, WirePull, WireSnapshot, WireStats,
    WireSubscription, WireTopic,
};
pub use server::TipsServer;
