//! Data models for protocol benchmarking
//!
//! This module contains the data structures shared by the transports, the
//! scheduler and the aggregator.

mod protocol;
mod timing;

pub use protocol::{split_tags, Protocol, UnsupportedProtocol};
pub use timing::{FailureKind, Outcome, PhaseDurations, TimingResult};
