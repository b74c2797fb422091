//! HTTP transports for protocol benchmarking
//!
//! Provides one client per HTTP generation, each recording connection
//! lifecycle phases into a per-request trace.

mod client;
mod connect;
mod error;
mod h1;
mod h2;
mod h3;
mod tls;
mod trace;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ProtocolClient, TransportSettings};
pub use error::{ClientError, TransportError};
pub use trace::PhaseTrace;
