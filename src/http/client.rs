//! Protocol client selection
//!
//! `ProtocolClient` is the single capability the scheduler needs: issue one
//! traced GET. Each variant keeps its own transport configuration.

use http::Uri;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::{ClientError, TransportError};
use super::h1::Http1Client;
use super::h2::Http2Client;
use super::h3::Http3Client;
use super::trace::PhaseTrace;
use crate::models::Protocol;

pub(crate) const USER_AGENT_VALUE: &str = concat!("httpbench/", env!("CARGO_PKG_VERSION"));

/// Transport tuning shared by all protocol clients
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Overall per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum idle HTTP/1.1 connections kept for reuse
    pub max_idle_per_host: usize,
    /// Idle HTTP/1.1 connections older than this are discarded
    pub idle_timeout_secs: u64,
    /// QUIC idle timeout in seconds
    pub quic_idle_timeout_secs: u64,
    /// QUIC keep-alive interval in seconds
    pub quic_keep_alive_secs: u64,
    /// Skip server certificate verification
    pub insecure: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_idle_per_host: 100,
            idle_timeout_secs: 90,
            quic_idle_timeout_secs: 30,
            quic_keep_alive_secs: 10,
            insecure: false,
        }
    }
}

impl TransportSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn quic_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.quic_idle_timeout_secs)
    }

    pub fn quic_keep_alive(&self) -> Duration {
        Duration::from_secs(self.quic_keep_alive_secs)
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }
}

enum Transport {
    Http1(Http1Client),
    Http2(Http2Client),
    Http3(Http3Client),
}

/// Client bound to exactly one HTTP protocol
pub struct ProtocolClient {
    transport: Transport,
    request_timeout: Duration,
}

impl ProtocolClient {
    /// Create a client for a protocol tag (`h1`, `h2` or `h3`).
    /// No request is issued here.
    pub fn create(tag: &str, settings: &TransportSettings) -> Result<Self, ClientError> {
        let protocol: Protocol = tag.parse()?;
        Self::for_protocol(protocol, settings)
    }

    pub fn for_protocol(protocol: Protocol, settings: &TransportSettings) -> Result<Self, ClientError> {
        let transport = match protocol {
            Protocol::Http1 => Transport::Http1(Http1Client::new(settings)?),
            Protocol::Http2 => Transport::Http2(Http2Client::new(settings)?),
            Protocol::Http3 => Transport::Http3(Http3Client::new(settings)?),
        };

        debug!(
            "Created {} client (timeout {}s)",
            protocol.name(),
            settings.request_timeout_secs
        );

        Ok(Self {
            transport,
            request_timeout: settings.request_timeout(),
        })
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn protocol(&self) -> Protocol {
        match self.transport {
            Transport::Http1(_) => Protocol::Http1,
            Transport::Http2(_) => Protocol::Http2,
            Transport::Http3(_) => Protocol::Http3,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Issue one GET, record its phases and drain the body
    pub(crate) async fn send(&self, uri: &Uri, trace: &mut PhaseTrace) -> Result<(), TransportError> {
        match &self.transport {
            Transport::Http1(client) => client.send(uri, trace).await,
            Transport::Http2(client) => client.send(uri, trace).await,
            Transport::Http3(client) => client.send(uri, trace).await,
        }
    }

    /// Release connection resources. Call only after every request using
    /// this client has finished.
    pub async fn close(&self) -> Result<(), TransportError> {
        match &self.transport {
            Transport::Http1(client) => {
                client.close().await;
                Ok(())
            }
            Transport::Http2(client) => {
                client.close().await;
                Ok(())
            }
            Transport::Http3(client) => client.close().await,
        }
    }

    /// Connection resources currently held: pooled HTTP/1.1 connections, the
    /// shared HTTP/2 connection, or the QUIC endpoint until it is closed
    pub async fn idle_connections(&self) -> usize {
        match &self.transport {
            Transport::Http1(client) => client.idle_count().await,
            Transport::Http2(client) => usize::from(client.is_connected().await),
            Transport::Http3(client) => usize::from(client.is_open()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnsupportedProtocol;

    #[tokio::test]
    async fn test_create_each_protocol() {
        let settings = TransportSettings::default();
        for protocol in Protocol::all() {
            let client = ProtocolClient::create(protocol.tag(), &settings).unwrap();
            assert_eq!(client.protocol(), protocol);
            assert_eq!(client.request_timeout(), Duration::from_secs(30));
            client.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_unsupported() {
        let err = ProtocolClient::create("h4", &TransportSettings::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ClientError::UnsupportedProtocol(UnsupportedProtocol(ref tag)) if tag == "h4"
        ));
    }

    #[tokio::test]
    async fn test_h3_holds_endpoint_until_closed() {
        let client = ProtocolClient::create("h3", &TransportSettings::default()).unwrap();
        assert_eq!(client.idle_connections().await, 1);
        client.close().await.unwrap();
        assert_eq!(client.idle_connections().await, 0);
    }

    #[tokio::test]
    async fn test_close_without_requests_holds_nothing() {
        for tag in ["h1", "h2"] {
            let client = ProtocolClient::create(tag, &TransportSettings::default()).unwrap();
            assert_eq!(client.idle_connections().await, 0);
            client.close().await.unwrap();
            assert_eq!(client.idle_connections().await, 0);
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings = TransportSettings::default();
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.idle_timeout(), Duration::from_secs(90));
        assert_eq!(settings.quic_keep_alive(), Duration::from_secs(10));
        assert!(!settings.insecure);
    }

    #[test]
    fn test_settings_partial_yaml() {
        let settings: TransportSettings =
            serde_yaml::from_str("request_timeout_secs: 5\ninsecure: true\n").unwrap();
        assert_eq!(settings.request_timeout_secs, 5);
        assert!(settings.insecure);
        assert_eq!(settings.max_idle_per_host, 100);
    }
}
