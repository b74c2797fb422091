//! Protocol benchmarking
//!
//! Aggregates per-request timings, orchestrates protocol batches and
//! persists run reports.

mod metrics;
mod report;
mod runner;

pub use metrics::{aggregate, BenchmarkResult};
pub use report::BenchmarkReport;
pub use runner::{unmatched_tags, BenchmarkRunner};
