//! Request execution engine
//!
//! Provides single-request execution and bounded parallel scheduling.

mod parallel;
mod request;

pub use parallel::{Batch, ParallelExecutor};
pub use request::execute;
