//! CLI command implementations.

pub mod call;
pub mod demo;
pub mod serve;
