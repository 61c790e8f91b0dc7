//! Core components of the count filter
//!
//! This module contains the counting and threshold logic:
//! - [`limits`]: Per-job limit configuration
//! - [`store`]: Global and per-host page/item counters
//! - [`evaluator`]: Turns counts and limits into a decision

pub mod evaluator;
pub mod limits;
pub mod store;
#[cfg(test)]
mod tests;

pub use evaluator::{
    Decision, DropReason, EvaluationMode, Overflow, OverflowPolicy, ShutdownReason,
    ThresholdEvaluator,
};
pub use limits::{LimitConfig, Metric};
pub use store::{Counter, CounterSnapshot, CounterStore, CounterStoreBuilder};
