//! HTTP/3 transport over QUIC
//!
//! A quinn endpoint owns the UDP socket; one QUIC connection is shared by all
//! requests. QUIC folds the transport and crypto handshakes together, so the
//! whole connection setup is recorded as the handshake phase and the TCP
//! connect phase stays unset.

use bytes::{Buf, Bytes};
use http::header::USER_AGENT;
use http::{Method, Request, Uri};
use quinn::crypto::rustls::QuicClientConfig;
use quinn::{ClientConfig, Connection, Endpoint, IdleTimeout, TransportConfig, VarInt};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::client::{TransportSettings, USER_AGENT_VALUE};
use super::connect::{self, Target};
use super::error::{ClientError, TransportError};
use super::tls::{self, ALPN_HTTP3};
use super::trace::{PhaseEvent, PhaseTrace};

/// Upper bound on waiting for the endpoint to drain on close
const CLOSE_GRACE: Duration = Duration::from_secs(2);

type H3Sender = h3::client::SendRequest<h3_quinn::OpenStreams, Bytes>;

struct SharedConnection {
    authority: String,
    quic: Connection,
    sender: H3Sender,
}

/// HTTP/3 client bound to a QUIC endpoint
pub struct Http3Client {
    endpoint: Endpoint,
    connection: Mutex<Option<SharedConnection>>,
    closed: AtomicBool,
}

impl Http3Client {
    /// Bind the client endpoint. Must be called from within a tokio runtime.
    pub fn new(settings: &TransportSettings) -> Result<Self, ClientError> {
        let tls = tls::client_config(ALPN_HTTP3, settings.insecure, true)?;
        let crypto = QuicClientConfig::try_from(tls)
            .map_err(|e| ClientError::Setup(format!("QUIC crypto config: {e}")))?;

        let mut transport = TransportConfig::default();
        transport.keep_alive_interval(Some(settings.quic_keep_alive()));
        let idle_timeout = IdleTimeout::try_from(settings.quic_idle_timeout())
            .map_err(|e| ClientError::Setup(format!("Invalid QUIC idle timeout: {e}")))?;
        transport.max_idle_timeout(Some(idle_timeout));

        let mut client_config = ClientConfig::new(Arc::new(crypto));
        client_config.transport_config(Arc::new(transport));

        let mut endpoint = bind_endpoint()?;
        endpoint.set_default_client_config(client_config);

        Ok(Self {
            endpoint,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) async fn send(&self, uri: &Uri, trace: &mut PhaseTrace) -> Result<(), TransportError> {
        let target = Target::from_uri(uri)?;
        let mut sender = self.sender_for(&target, trace).await?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(())
            .map_err(TransportError::transport)?;

        let mut stream = sender
            .send_request(request)
            .await
            .map_err(TransportError::transport)?;
        stream.finish().await.map_err(TransportError::transport)?;

        let response = stream
            .recv_response()
            .await
            .map_err(TransportError::transport)?;
        trace.record(PhaseEvent::FirstByte);
        trace.record_status(response.status().as_u16());

        while let Some(mut chunk) = stream.recv_data().await.map_err(TransportError::transport)? {
            chunk.advance(chunk.remaining());
        }

        Ok(())
    }

    async fn sender_for(
        &self,
        target: &Target,
        trace: &mut PhaseTrace,
    ) -> Result<H3Sender, TransportError> {
        let mut slot = self.connection.lock().await;

        if let Some(shared) = slot.as_ref() {
            if shared.authority == target.authority && shared.quic.close_reason().is_none() {
                return Ok(shared.sender.clone());
            }
        }

        let shared = self.dial(target, trace).await?;
        let sender = shared.sender.clone();
        *slot = Some(shared);
        Ok(sender)
    }

    async fn dial(
        &self,
        target: &Target,
        trace: &mut PhaseTrace,
    ) -> Result<SharedConnection, TransportError> {
        if !target.secure {
            return Err(TransportError::Transport(
                "HTTP/3 requires an https URL".to_string(),
            ));
        }

        let addrs = connect::resolve(target, trace).await?;
        let dual_stack = self
            .endpoint
            .local_addr()
            .map(|local| local.is_ipv6())
            .unwrap_or(false);
        let addr = addrs
            .iter()
            .copied()
            .find(|a| dual_stack || a.is_ipv4())
            .ok_or_else(|| {
                TransportError::Connect(format!(
                    "no IPv4 address for {} and IPv6 is unavailable",
                    target.host
                ))
            })?;

        trace.record(PhaseEvent::TlsStart);
        let connecting = self
            .endpoint
            .connect(addr, &target.host)
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let quic = connecting.await;
        trace.record(PhaseEvent::TlsDone);
        let quic = quic.map_err(|e| TransportError::Handshake(e.to_string()))?;

        let (mut driver, sender) = h3::client::new(h3_quinn::Connection::new(quic.clone()))
            .await
            .map_err(|e| TransportError::Handshake(format!("HTTP/3 setup: {e}")))?;

        let authority = target.authority.clone();
        tokio::spawn(async move {
            let closed = driver.wait_idle().await;
            debug!("HTTP/3 connection to {} closed: {:?}", authority, closed);
        });

        debug!("Opened HTTP/3 connection to {} ({})", target.authority, addr);
        Ok(SharedConnection {
            authority: target.authority.clone(),
            quic,
            sender,
        })
    }

    /// Close the live connection and the endpoint, waiting briefly for the
    /// close frames to go out.
    pub(crate) async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        if let Some(shared) = self.connection.lock().await.take() {
            shared.quic.close(VarInt::from_u32(0), b"benchmark complete");
        }

        self.endpoint.close(VarInt::from_u32(0), b"benchmark complete");
        tokio::time::timeout(CLOSE_GRACE, self.endpoint.wait_idle())
            .await
            .map_err(|_| TransportError::Timeout(CLOSE_GRACE))?;

        debug!("QUIC endpoint closed");
        Ok(())
    }

    /// Whether the endpoint is still held, i.e. `close` has not run
    pub(crate) fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

/// Bind a dual-stack UDP socket so both IPv4 and IPv6 targets are reachable.
/// Hosts without IPv6 get an IPv4-only socket.
fn bind_endpoint() -> Result<Endpoint, ClientError> {
    match Endpoint::client(SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))) {
        Ok(endpoint) => Ok(endpoint),
        Err(e) => {
            debug!("IPv6 QUIC socket unavailable ({}), binding IPv4 only", e);
            Endpoint::client(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
                .map_err(|e| ClientError::Setup(format!("Cannot create QUIC endpoint: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::execute;
    use crate::http::testing::spawn_h3_server;
    use crate::http::ProtocolClient;
    use crate::models::{FailureKind, Protocol};
    use std::net::IpAddr;

    fn insecure() -> TransportSettings {
        TransportSettings {
            insecure: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_http3_request() {
        let server = spawn_h3_server(IpAddr::from(Ipv4Addr::LOCALHOST)).await.unwrap();
        let client = ProtocolClient::create("h3", &insecure()).unwrap();
        let url: Uri = server.url("/api/protocol").parse().unwrap();

        let first = execute(&client, &url).await;
        let second = execute(&client, &url).await;

        assert!(first.is_success(), "{:?}", first.outcome);
        assert_eq!(first.protocol, Protocol::Http3);
        assert_eq!(first.status_code, Some(200));
        assert!(first.phases.tls_handshake > Duration::ZERO);
        assert_eq!(first.phases.tcp_connect, Duration::ZERO);
        assert!(second.is_success(), "{:?}", second.outcome);
        assert_eq!(second.phases.tls_handshake, Duration::ZERO);
        assert_eq!(server.connections(), 1);

        assert_eq!(client.idle_connections().await, 1);
        client.close().await.unwrap();
        assert_eq!(client.idle_connections().await, 0);
    }

    #[tokio::test]
    async fn test_http3_ipv6_target() {
        let Some(server) = spawn_h3_server(IpAddr::from(Ipv6Addr::LOCALHOST)).await else {
            // no IPv6 loopback on this host
            return;
        };
        let client = ProtocolClient::create("h3", &insecure()).unwrap();
        let url: Uri = server.url("/").parse().unwrap();

        let result = execute(&client, &url).await;

        assert!(result.is_success(), "{:?}", result.outcome);
        assert_eq!(result.status_code, Some(200));
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_self_signed_cert_rejected_by_default() {
        let server = spawn_h3_server(IpAddr::from(Ipv4Addr::LOCALHOST)).await.unwrap();
        let client = ProtocolClient::create("h3", &TransportSettings::default()).unwrap();
        let url: Uri = server.url("/").parse().unwrap();

        let result = execute(&client, &url).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Handshake));
        client.close().await.unwrap();
    }
}
