//! # tips testkit
//!
//! Test utilities for the tips broker.
//!
//! This crate provides:
//! - Broker fixtures with a topic and subscription ready to use
//! - Property-based test generators using proptest
//! - Multi-threaded publish/pull stress harness
//!
//! ## Usage
//!
//! ```
//! use tips_testkit::prelude::*;
//!
//! with_test_broker(|broker| {
//!     broker.publish(broker.topic_name(), numbered_payloads(3)).unwrap();
//!     let pulled = broker.pull_now(3, true).unwrap();
//!     assert_eq!(pulled.len(), 3);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
