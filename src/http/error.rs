//! Transport error types

use std::time::Duration;
use thiserror::Error;

use crate::models::{FailureKind, UnsupportedProtocol};

/// Errors raised while creating a protocol client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    UnsupportedProtocol(#[from] UnsupportedProtocol),

    #[error("Transport setup failed: {0}")]
    Setup(String),
}

/// Per-request transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("DNS lookup failed for {host}: {reason}")]
    Dns { host: String, reason: String },

    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Dns { .. } => FailureKind::Dns,
            TransportError::Connect(_) => FailureKind::Connect,
            TransportError::Handshake(_) => FailureKind::Handshake,
            TransportError::Timeout(_) => FailureKind::Timeout,
            TransportError::Transport(_) => FailureKind::Transport,
        }
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        TransportError::Transport(err.to_string())
    }
}
