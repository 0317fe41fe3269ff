//! SOCKS5 listener
//!
//! Binds the listening socket and spawns one task per accepted
//! connection. Connections share nothing but the read-only connector.

use crate::config::{Config, ServerConfig};
use crate::error::ProxyError;
use crate::socks::{handle_socks5_connection, TcpConnector};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// A bound SOCKS5 server
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    connector: Arc<TcpConnector>,
}

impl Server {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

        Ok(Server {
            listener,
            connector: Arc::new(TcpConnector::from_config(config)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until a shutdown signal arrives
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        info!("SOCKS5 server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            let connector = Arc::clone(&self.connector);
                            tokio::spawn(async move {
                                let result = handle_socks5_connection(stream, &*connector).await;
                                log_outcome(peer, result);
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Bind and serve until shutdown
pub async fn run_server(config: Config, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    Server::bind(&config.server).await?.run(shutdown_rx).await
}

fn log_outcome(peer: SocketAddr, result: Result<(), ProxyError>) {
    match result {
        Ok(()) => debug!("Connection from {} closed", peer),
        Err(ProxyError::UnsupportedCommand(cmd)) => {
            info!("Rejected command 0x{:02x} from {}", cmd, peer)
        }
        Err(ProxyError::Dial(e)) => warn!("Dial for {} failed: {}", peer, e),
        Err(e) => debug!("Connection from {} ended: {}", peer, e),
    }
}
