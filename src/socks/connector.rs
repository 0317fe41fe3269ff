//! Upstream connector
//!
//! Dials the destination of a CONNECT request under a bounded timeout and
//! classifies failures into [`DialErrorKind`]s.

use crate::config::{ServerConfig, TcpConfig};
use crate::error::{DialError, DialErrorKind};
use async_trait::async_trait;
use std::fmt::Debug;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Default upstream connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Socket options for upstream connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: Some(config.keepalive_secs),
            keepalive_interval: Some(config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// Process-wide redirection target
///
/// A target with a port replaces the whole destination. A bare host
/// replaces only the host and keeps the port the client asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseProxy {
    /// Replace the host only
    Host(String),
    /// Replace host and port
    HostPort(String, u16),
}

impl ReverseProxy {
    /// Parse `host`, `ip`, `host:port`, `ip:port` or `[v6]:port`
    pub fn parse(target: &str) -> Self {
        let target = target.trim();

        if let Ok(addr) = target.parse::<SocketAddr>() {
            return ReverseProxy::HostPort(addr.ip().to_string(), addr.port());
        }
        if target.parse::<IpAddr>().is_ok() {
            return ReverseProxy::Host(target.to_string());
        }
        if let Some((host, port)) = target.rsplit_once(':') {
            if !host.contains(':') {
                if let Ok(port) = port.parse::<u16>() {
                    return ReverseProxy::HostPort(host.to_string(), port);
                }
            }
        }

        ReverseProxy::Host(
            target
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_string(),
        )
    }

    /// Apply the redirection to a requested destination
    pub fn redirect<'a>(&'a self, _host: &'a str, port: u16) -> (&'a str, u16) {
        match self {
            ReverseProxy::Host(host) => (host, port),
            ReverseProxy::HostPort(host, port) => (host, *port),
        }
    }
}

/// Something that can open an upstream byte stream
#[async_trait]
pub trait Dialer: Send + Sync {
    /// The stream type produced by this dialer
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + Debug + 'static;

    /// Connect to `host:port`
    async fn dial(&self, host: &str, port: u16) -> Result<Self::Stream, DialError>;
}

/// Plain TCP dialer used in production
#[derive(Debug, Clone)]
pub struct TcpConnector {
    /// Bound on resolution plus connect
    connect_timeout: Duration,
    /// Optional global redirection
    reverse_proxy: Option<ReverseProxy>,
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
}

impl TcpConnector {
    /// Create a connector with default options
    pub fn with_defaults() -> Self {
        TcpConnector {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reverse_proxy: None,
            socket_opts: SocketOpts::default(),
        }
    }

    /// Create a connector from server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        TcpConnector {
            connect_timeout: config.connect_timeout(),
            reverse_proxy: config.reverse_proxy_target().map(ReverseProxy::parse),
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Redirect every dial to `target`
    pub fn with_reverse_proxy(mut self, target: &str) -> Self {
        self.reverse_proxy = Some(ReverseProxy::parse(target));
        self
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Configured reverse-proxy target
    pub fn reverse_proxy(&self) -> Option<&ReverseProxy> {
        self.reverse_proxy.as_ref()
    }

    /// Resolve and connect, bounded by the connect timeout
    pub async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, DialError> {
        let (host, port) = match &self.reverse_proxy {
            Some(reverse_proxy) => reverse_proxy.redirect(host, port),
            None => (host, port),
        };
        let target = format_target(host, port);

        debug!("Connecting to target: {}", target);

        let result =
            tokio::time::timeout(self.connect_timeout, connect_any(host, port, &target)).await;
        let stream = match result {
            Ok(connected) => connected?,
            Err(_) => return Err(DialError::new(DialErrorKind::Timeout, target)),
        };

        if let Err(e) = self.socket_opts.apply(&stream) {
            warn!("Failed to apply socket options to {}: {}", target, e);
        }

        Ok(stream)
    }
}

#[async_trait]
impl Dialer for TcpConnector {
    type Stream = TcpStream;

    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream, DialError> {
        self.connect(host, port).await
    }
}

/// Try every resolved address in order
async fn connect_any(host: &str, port: u16, target: &str) -> Result<TcpStream, DialError> {
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| DialError::with_source(DialErrorKind::ResolutionFailure, target, e))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Failed to connect to {}: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => DialError::from_connect(target, e),
        None => DialError::new(DialErrorKind::ResolutionFailure, target),
    })
}

fn format_target(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
