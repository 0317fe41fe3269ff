//! Server configuration types
//!
//! Defines the main configuration structures for the socksfwd server.

use super::TcpConfig;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default port when none is configured
const DEFAULT_PORT: u16 = 1080;

/// Default listen address
fn default_listen_addr() -> String {
    format!("0.0.0.0:{}", DEFAULT_PORT)
}

/// Default upstream connect timeout in seconds
fn default_connect_timeout() -> u64 {
    3
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Redirect every CONNECT to this target (`host` or `host:port`)
    #[serde(default)]
    pub reverse_proxy: Option<String>,

    /// Upstream connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Upstream socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            reverse_proxy: None,
            connect_timeout: default_connect_timeout(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reverse-proxy target, ignoring blank values
    pub fn reverse_proxy_target(&self) -> Option<&str> {
        self.reverse_proxy
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty())
    }

    /// Upstream connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout == 0 {
            bail!("connect_timeout must be greater than zero");
        }
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            bail!("Invalid listen address: {}", self.listen_addr);
        }
        Ok(())
    }
}

/// Turn a port setting into a listen address
///
/// `1080` and `:1080` listen on all interfaces; anything containing a
/// host part is used verbatim.
pub fn listen_addr_from_port(port: &str) -> String {
    let port = port.trim();
    if port.is_empty() {
        default_listen_addr()
    } else if let Some(rest) = port.strip_prefix(':') {
        format!("0.0.0.0:{}", rest)
    } else if !port.contains(':') {
        format!("0.0.0.0:{}", port)
    } else {
        port.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:1080");
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert!(config.reverse_proxy_target().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reverse_proxy_blank_is_unset() {
        let config = ServerConfig {
            reverse_proxy: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.reverse_proxy_target().is_none());

        let config = ServerConfig {
            reverse_proxy: Some("backend:80".to_string()),
            ..Default::default()
        };
        assert_eq!(config.reverse_proxy_target(), Some("backend:80"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = ServerConfig {
            connect_timeout: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_listen_addr() {
        let config = ServerConfig {
            listen_addr: "localhost".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listen_addr_from_port() {
        assert_eq!(listen_addr_from_port("1080"), "0.0.0.0:1080");
        assert_eq!(listen_addr_from_port(":9050"), "0.0.0.0:9050");
        assert_eq!(listen_addr_from_port("127.0.0.1:1081"), "127.0.0.1:1081");
        assert_eq!(listen_addr_from_port("[::1]:1080"), "[::1]:1080");
        assert_eq!(listen_addr_from_port(""), "0.0.0.0:1080");
    }
}
