//! HTTP/2 transport
//!
//! All requests share one multiplexed connection. Over TLS the server must
//! select `h2` through ALPN; cleartext targets are spoken to with prior
//! knowledge. There is no fallback to HTTP/1.1.

use bytes::Bytes;
use http::header::USER_AGENT;
use http::{Method, Request, Uri};
use http_body_util::Empty;
use hyper::client::conn::http2::{self, SendRequest};
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::ClientConfig;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::client::{TransportSettings, USER_AGENT_VALUE};
use super::connect::{self, Target};
use super::error::{ClientError, TransportError};
use super::tls::{self, ALPN_HTTP2};
use super::trace::{PhaseEvent, PhaseTrace};

struct SharedConnection {
    authority: String,
    sender: SendRequest<Empty<Bytes>>,
}

/// HTTP/2-only client
pub struct Http2Client {
    tls: Arc<ClientConfig>,
    connection: Mutex<Option<SharedConnection>>,
}

impl Http2Client {
    pub fn new(settings: &TransportSettings) -> Result<Self, ClientError> {
        let tls = tls::client_config(ALPN_HTTP2, settings.insecure, false)?;

        Ok(Self {
            tls: Arc::new(tls),
            connection: Mutex::new(None),
        })
    }

    pub(crate) async fn send(&self, uri: &Uri, trace: &mut PhaseTrace) -> Result<(), TransportError> {
        let target = Target::from_uri(uri)?;
        let mut sender = self.sender_for(&target, trace).await?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(connect::empty_body())
            .map_err(TransportError::transport)?;

        let response = sender
            .send_request(request)
            .await
            .map_err(TransportError::transport)?;
        trace.record(PhaseEvent::FirstByte);
        trace.record_status(response.status().as_u16());

        connect::drain(response.into_body()).await?;
        Ok(())
    }

    /// Reuse the shared connection, dialing a new one if it is gone.
    /// Concurrent callers wait on the lock while the first one dials.
    async fn sender_for(
        &self,
        target: &Target,
        trace: &mut PhaseTrace,
    ) -> Result<SendRequest<Empty<Bytes>>, TransportError> {
        let mut slot = self.connection.lock().await;

        if let Some(shared) = slot.as_ref() {
            if shared.authority == target.authority && !shared.sender.is_closed() {
                return Ok(shared.sender.clone());
            }
        }

        let sender = self.dial(target, trace).await?;
        *slot = Some(SharedConnection {
            authority: target.authority.clone(),
            sender: sender.clone(),
        });
        Ok(sender)
    }

    async fn dial(
        &self,
        target: &Target,
        trace: &mut PhaseTrace,
    ) -> Result<SendRequest<Empty<Bytes>>, TransportError> {
        let (io, alpn) = connect::open_stream(target, &self.tls, trace).await?;

        if target.secure && alpn.as_deref() != Some(ALPN_HTTP2) {
            return Err(TransportError::Handshake(format!(
                "{} did not negotiate h2 via ALPN",
                target.authority
            )));
        }

        let (sender, connection) = http2::handshake(TokioExecutor::new(), TokioIo::new(io))
            .await
            .map_err(TransportError::transport)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("HTTP/2 connection closed with error: {}", e);
            }
        });

        debug!("Opened HTTP/2 connection to {}", target.authority);
        Ok(sender)
    }

    pub(crate) async fn close(&self) {
        if self.connection.lock().await.take().is_some() {
            debug!("Closed shared HTTP/2 connection");
        }
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .map(|c| !c.sender.is_closed())
            .unwrap_or(false)
    }
}
