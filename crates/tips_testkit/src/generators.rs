//! Property-based test generators using proptest.
//!
//! Provides strategies for generating names, payloads and operation
//! sequences that the broker accepts.

use bytes::Bytes;
use proptest::prelude::*;
use std::time::Duration;
use tips_core::PullRequest;

/// Strategy for generating valid topic, subscription or snapshot names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.-]{0,31}").expect("Invalid regex")
}

/// Strategy for generating a single payload (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..256).prop_map(Bytes::from)
}

/// Strategy for generating a non-empty publish batch.
pub fn payload_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<Bytes>> {
    prop::collection::vec(payload_strategy(), 1..=max_len.max(1))
}

/// Strategy for generating non-blocking pull requests.
pub fn pull_request_strategy(max_limit: usize) -> impl Strategy<Value = PullRequest> {
    (1..=max_limit.max(1), any::<bool>()).prop_map(|(limit, autoack)| {
        PullRequest::new(limit)
            .autoack(autoack)
            .timeout(Duration::ZERO)
    })
}

/// A single broker operation against one subscription.
#[derive(Debug, Clone)]
pub enum BrokerOp {
    /// Publish a batch.
    Publish(Vec<Bytes>),
    /// Pull without waiting.
    Pull {
        /// Maximum messages.
        limit: usize,
        /// Acknowledge on delivery.
        autoack: bool,
    },
    /// Ack the id at this position relative to the tail, modulo the tail.
    Ack(u64),
    /// Snapshot under the given name.
    Snapshot(String),
    /// Restore the given snapshot name.
    Restore(String),
}

/// Strategy for generating broker operations.
///
/// Snapshot names come from a small pool so restores often hit an
/// existing snapshot.
pub fn broker_op_strategy() -> impl Strategy<Value = BrokerOp> {
    let snapshot_name = prop::sample::select(vec!["a", "b", "c"]).prop_map(String::from);
    prop_oneof![
        3 => payload_batch_strategy(8).prop_map(BrokerOp::Publish),
        3 => (1usize..10, any::<bool>())
            .prop_map(|(limit, autoack)| BrokerOp::Pull { limit, autoack }),
        2 => any::<u64>().prop_map(BrokerOp::Ack),
        1 => snapshot_name.clone().prop_map(BrokerOp::Snapshot),
        1 => snapshot_name.prop_map(BrokerOp::Restore),
    ]
}

/// Strategy for generating a sequence of broker operations.
pub fn broker_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<BrokerOp>> {
    prop::collection::vec(broker_op_strategy(), 1..=max_len.max(1))
}
