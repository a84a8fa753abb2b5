//! # tips core
//!
//! Topic-based message broker core for tips.
//!
//! This crate provides:
//! - Per-topic append-only message logs with gapless sequence ids
//! - A topic registry with cascading teardown
//! - Subscriptions with delivery and acknowledged cursors
//! - Blocking (long-poll) pulls woken by appends
//! - Named snapshots that capture and restore a subscription's position
//!
//! The [`Broker`] type composes these into a synchronous API. Transports
//! (HTTP, TCP, in-process) call it and translate [`ErrorCategory`] into
//! their own status vocabulary.
//!
//! ```
//! use std::time::Duration;
//! use tips_core::{Broker, PullRequest};
//!
//! let broker = Broker::default();
//! broker.create_topic("t1").unwrap();
//! broker.subscribe("t1", "s1").unwrap();
//! broker.publish("t1", ["0", "1", "2"]).unwrap();
//!
//! broker.create_snapshot("t1", "s1", "start").unwrap();
//! let first = broker.pull("t1", "s1", PullRequest::new(3).autoack(true)).unwrap();
//!
//! broker.restore_snapshot("t1", "s1", "start").unwrap();
//! let replay = broker.pull("t1", "s1", PullRequest::new(3).autoack(true)).unwrap();
//! assert_eq!(first.messages, replay.messages);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod broker;
mod cancel;
mod config;
mod error;
mod log;
mod registry;
mod snapshot;
mod stats;
mod subscription;
mod types;

pub use broker::Broker;
pub use cancel::CancelToken;
pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult, ErrorCategory, ResourceKind};
pub use log::{MessageLog, WaitOutcome};
pub use registry::{Topic, TopicRegistry};
pub use snapshot::SnapshotStore;
pub use stats::{BrokerStats, StatsSnapshot};
pub use subscription::{Cursors, Subscription};
pub use types::{
    Message, MessageId, PullRequest, PullResult, SnapshotInfo, SubscriptionInfo, TopicInfo,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
