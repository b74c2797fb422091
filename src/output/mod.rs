//! Output formatting module
//!
//! Provides table, JSON and CSV output for benchmark results.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
