//! Protocol models
//!
//! Defines the three HTTP generations under comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tag did not name one of the supported protocols
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported protocol: {0} (expected h1, h2 or h3)")]
pub struct UnsupportedProtocol(pub String);

/// Supported HTTP protocol generations
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "h1")]
    Http1,
    #[serde(rename = "h2")]
    Http2,
    #[serde(rename = "h3")]
    Http3,
}

impl Protocol {
    /// Short tag used on the command line and in reports
    pub fn tag(&self) -> &'static str {
        match self {
            Protocol::Http1 => "h1",
            Protocol::Http2 => "h2",
            Protocol::Http3 => "h3",
        }
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Http1 => "HTTP/1.1",
            Protocol::Http2 => "HTTP/2",
            Protocol::Http3 => "HTTP/3 (QUIC)",
        }
    }

    /// Transport the protocol runs on
    pub fn transport(&self) -> &'static str {
        match self {
            Protocol::Http1 | Protocol::Http2 => "TCP + TLS",
            Protocol::Http3 => "QUIC (UDP)",
        }
    }

    /// Get all protocols in comparison order
    pub fn all() -> Vec<Protocol> {
        vec![Protocol::Http1, Protocol::Http2, Protocol::Http3]
    }
}

impl FromStr for Protocol {
    type Err = UnsupportedProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h1" => Ok(Protocol::Http1),
            "h2" => Ok(Protocol::Http2),
            "h3" => Ok(Protocol::Http3),
            _ => Err(UnsupportedProtocol(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Split a comma-separated protocol list into trimmed, non-empty tags
pub fn split_tags(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
