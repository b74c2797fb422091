//! Connection establishment for TCP based transports
//!
//! Resolution, TCP connect and TLS handshake are performed step by step so
//! each boundary can be recorded in the request's `PhaseTrace`.

use bytes::Bytes;
use http::Uri;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use super::error::TransportError;
use super::trace::{PhaseEvent, PhaseTrace};

/// Byte stream a connection runs over, plain TCP or TLS
pub(crate) trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

pub(crate) type BoxedIo = Box<dyn Io>;

/// Where a request goes, derived from its URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Target {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    /// `host[:port]` as written in the URL, used for Host and pool keys
    pub authority: String,
}

impl Target {
    pub fn from_uri(uri: &Uri) -> Result<Self, TransportError> {
        let secure = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            other => {
                return Err(TransportError::Transport(format!(
                    "Unsupported URL scheme: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };

        let host = uri
            .host()
            .ok_or_else(|| TransportError::Transport(format!("URL has no host: {uri}")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
        let authority = uri
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| host.clone());

        Ok(Self {
            host,
            port,
            secure,
            authority,
        })
    }

    pub fn server_name(&self) -> Result<ServerName<'static>, TransportError> {
        ServerName::try_from(self.host.clone())
            .map_err(|e| TransportError::Handshake(format!("Invalid server name {}: {e}", self.host)))
    }
}

/// Resolve the target host. IP literals skip resolution entirely, leaving the
/// DNS phase unset.
pub(crate) async fn resolve(
    target: &Target,
    trace: &mut PhaseTrace,
) -> Result<Vec<SocketAddr>, TransportError> {
    if let Ok(ip) = target.host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, target.port)]);
    }

    trace.record(PhaseEvent::DnsStart);
    let lookup = lookup_host((target.host.as_str(), target.port)).await;
    trace.record(PhaseEvent::DnsDone);

    let addrs: Vec<SocketAddr> = lookup
        .map_err(|e| TransportError::Dns {
            host: target.host.clone(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::Dns {
            host: target.host.clone(),
            reason: "no addresses returned".to_string(),
        });
    }

    Ok(addrs)
}

/// Connect to the first reachable address
pub(crate) async fn connect_tcp(
    addrs: &[SocketAddr],
    trace: &mut PhaseTrace,
) -> Result<TcpStream, TransportError> {
    let mut last_error = None;

    for addr in addrs {
        trace.record(PhaseEvent::ConnectStart);
        let attempt = TcpStream::connect(addr).await;
        trace.record(PhaseEvent::ConnectDone);

        match attempt {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY on {}: {}", addr, e);
                }
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(format!("{addr}: {e}"));
            }
        }
    }

    Err(TransportError::Connect(
        last_error.unwrap_or_else(|| "no addresses to connect to".to_string()),
    ))
}

/// Run the TLS handshake, returning the stream and the negotiated ALPN protocol
pub(crate) async fn handshake_tls(
    stream: TcpStream,
    target: &Target,
    config: Arc<ClientConfig>,
    trace: &mut PhaseTrace,
) -> Result<(TlsStream<TcpStream>, Option<Vec<u8>>), TransportError> {
    let server_name = target.server_name()?;

    trace.record(PhaseEvent::TlsStart);
    let handshake = TlsConnector::from(config).connect(server_name, stream).await;
    trace.record(PhaseEvent::TlsDone);

    let tls = handshake.map_err(|e| TransportError::Handshake(e.to_string()))?;
    let alpn = tls.get_ref().1.alpn_protocol().map(<[u8]>::to_vec);
    Ok((tls, alpn))
}

/// Resolve, connect and (for https) secure a new stream to the target
pub(crate) async fn open_stream(
    target: &Target,
    tls: &Arc<ClientConfig>,
    trace: &mut PhaseTrace,
) -> Result<(BoxedIo, Option<Vec<u8>>), TransportError> {
    let addrs = resolve(target, trace).await?;
    let tcp = connect_tcp(&addrs, trace).await?;

    if target.secure {
        let (stream, alpn) = handshake_tls(tcp, target, tls.clone(), trace).await?;
        Ok((Box::new(stream), alpn))
    } else {
        Ok((Box::new(tcp), None))
    }
}

/// Read and discard the whole response body, returning its length
pub(crate) async fn drain(mut body: Incoming) -> Result<u64, TransportError> {
    let mut received = 0u64;
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(TransportError::transport)?;
        if let Some(data) = frame.data_ref() {
            received += data.len() as u64;
        }
    }
    Ok(received)
}

/// Request path for HTTP/1.1 origin-form request lines
pub(crate) fn origin_form(uri: &Uri) -> Uri {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .parse()
        .unwrap_or_else(|_| Uri::from_static("/"))
}

pub(crate) fn empty_body() -> http_body_util::Empty<Bytes> {
    http_body_util::Empty::new()
}
