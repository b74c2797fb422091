//! Per-request timing models
//!
//! A `TimingResult` is produced once per request attempt and never changed.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::Protocol;

/// Classification of a failed request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Name resolution failed
    Dns,
    /// Transport connection could not be established
    Connect,
    /// TLS or QUIC handshake failed
    Handshake,
    /// Request exceeded the client timeout
    Timeout,
    /// Any other transport-level error
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Dns => "dns",
            FailureKind::Connect => "connect",
            FailureKind::Handshake => "handshake",
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "transport",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a request attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { kind: FailureKind, reason: String },
}

impl Outcome {
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        Outcome::Failure {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Durations of the five request phases
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhaseDurations {
    pub dns_lookup: Duration,
    pub tcp_connect: Duration,
    pub tls_handshake: Duration,
    pub time_to_first_byte: Duration,
    pub content_transfer: Duration,
}

/// Timing of a single request attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimingResult {
    pub protocol: Protocol,
    pub phases: PhaseDurations,
    /// Request issuance until the body was drained or the failure was detected
    pub total_time: Duration,
    /// Status of the response head, if one arrived
    pub status_code: Option<u16>,
    pub outcome: Outcome,
}

impl TimingResult {
    /// Successful attempt with the given phases
    pub fn success(
        protocol: Protocol,
        phases: PhaseDurations,
        total_time: Duration,
        status_code: u16,
    ) -> Self {
        Self {
            protocol,
            phases,
            total_time,
            status_code: Some(status_code),
            outcome: Outcome::Success,
        }
    }

    /// Failed attempt that produced no usable phases
    pub fn failure(
        protocol: Protocol,
        kind: FailureKind,
        reason: impl Into<String>,
        total_time: Duration,
    ) -> Self {
        Self {
            protocol,
            phases: PhaseDurations::default(),
            total_time,
            status_code: None,
            outcome: Outcome::failure(kind, reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Failure classification, if the attempt failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }
}
