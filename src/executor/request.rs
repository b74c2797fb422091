//! Single request execution
//!
//! Issues one traced GET through a protocol client and converts the trace into
//! a `TimingResult`.

use http::Uri;
use std::time::Instant;

use crate::http::{PhaseTrace, ProtocolClient, TransportError};
use crate::models::{Outcome, TimingResult};

/// Execute one request. Never fails: transport errors and timeouts come back
/// as failed results with the elapsed time until detection.
pub async fn execute(client: &ProtocolClient, url: &Uri) -> TimingResult {
    let timeout = client.request_timeout();
    let mut trace = PhaseTrace::begin();

    let attempt = tokio::time::timeout(timeout, client.send(url, &mut trace)).await;
    let end = Instant::now();

    let outcome = match attempt {
        Ok(Ok(())) => Outcome::Success,
        Ok(Err(e)) => Outcome::failure(e.kind(), e.to_string()),
        Err(_) => {
            let e = TransportError::Timeout(timeout);
            Outcome::failure(e.kind(), e.to_string())
        }
    };

    trace.finish(client.protocol(), end, outcome)
}
