//! HTTP/1.1 transport
//!
//! Keep-alive connections are pooled per authority. ALPN only offers
//! `http/1.1` and no upgrade is ever attempted.

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::Empty;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::client::{TransportSettings, USER_AGENT_VALUE};
use super::connect::{self, Target};
use super::error::{ClientError, TransportError};
use super::tls::{self, ALPN_HTTP1};
use super::trace::{PhaseEvent, PhaseTrace};

struct IdleConnection {
    authority: String,
    sender: SendRequest<Empty<Bytes>>,
    idle_since: Instant,
}

/// HTTP/1.1 client with a bounded idle-connection pool
pub struct Http1Client {
    tls: Arc<ClientConfig>,
    idle: Mutex<Vec<IdleConnection>>,
    max_idle: usize,
    idle_timeout: Duration,
}

impl Http1Client {
    pub fn new(settings: &TransportSettings) -> Result<Self, ClientError> {
        let tls = tls::client_config(ALPN_HTTP1, settings.insecure, false)?;

        Ok(Self {
            tls: Arc::new(tls),
            idle: Mutex::new(Vec::new()),
            max_idle: settings.max_idle_per_host,
            idle_timeout: settings.idle_timeout(),
        })
    }

    pub(crate) async fn send(&self, uri: &Uri, trace: &mut PhaseTrace) -> Result<(), TransportError> {
        let target = Target::from_uri(uri)?;

        let mut sender = match self.checkout(&target.authority).await {
            Some(sender) => sender,
            None => self.dial(&target, trace).await?,
        };

        let request = Request::builder()
            .method(Method::GET)
            .uri(connect::origin_form(uri))
            .header(HOST, target.authority.as_str())
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
        self.checkin(target.authority, sender).await;
        Ok(())
    }

    /// Take a live idle connection for the authority, discarding stale ones
    async fn checkout(&self, authority: &str) -> Option<SendRequest<Empty<Bytes>>> {
        loop {
            let conn = {
                let mut idle = self.idle.lock().await;
                let pos = idle.iter().rposition(|c| c.authority == authority)?;
                idle.swap_remove(pos)
            };

            if conn.idle_since.elapsed() > self.idle_timeout || conn.sender.is_closed() {
                continue;
            }

            let mut sender = conn.sender;
            if sender.ready().await.is_ok() {
                return Some(sender);
            }
        }
    }

    async fn checkin(&self, authority: String, sender: SendRequest<Empty<Bytes>>) {
        if sender.is_closed() {
            return;
        }

        let mut idle = self.idle.lock().await;
        if idle.len() < self.max_idle {
            idle.push(IdleConnection {
                authority,
                sender,
                idle_since: Instant::now(),
            });
        }
    }

    async fn dial(
        &self,
        target: &Target,
        trace: &mut PhaseTrace,
    ) -> Result<SendRequest<Empty<Bytes>>, TransportError> {
        let (io, _alpn) = connect::open_stream(target, &self.tls, trace).await?;

        let (sender, connection) = http1::handshake(TokioIo::new(io))
            .await
            .map_err(TransportError::transport)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("HTTP/1.1 connection closed with error: {}", e);
            }
        });

        debug!("Opened HTTP/1.1 connection to {}", target.authority);
        Ok(sender)
    }

    /// Drop every pooled connection
    pub(crate) async fn close(&self) {
        let mut idle = self.idle.lock().await;
        debug!("Closing {} idle HTTP/1.1 connection(s)", idle.len());
        idle.clear();
    }

    pub(crate) async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}
