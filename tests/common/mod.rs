//! Test utilities for socksfwd integration tests

#![allow(dead_code)]

use socksfwd::config::ServerConfig;
use socksfwd::server::Server;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A loopback port with nothing listening on it
pub async fn closed_port() -> u16 {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr.port()
}

/// A proxy running on an ephemeral loopback port
pub struct TestProxy {
    /// Address clients connect to
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
}

impl TestProxy {
    /// Start a proxy, optionally redirecting every CONNECT
    pub async fn start(reverse_proxy: Option<&str>) -> Self {
        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            reverse_proxy: reverse_proxy.map(str::to_string),
            ..Default::default()
        };

        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(server.run(shutdown_rx));

        TestProxy { addr, shutdown_tx }
    }

    /// Connect and complete the no-auth greeting
    pub async fn connect_greeted(&self) -> TcpStream {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream
            .write_all(&socks5_mock::create_auth_request_no_auth())
            .await
            .unwrap();

        let mut selection = [0u8; 2];
        stream.read_exact(&mut selection).await.unwrap();
        assert_eq!(selection, [0x05, 0x00]);
        stream
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Read one 10-byte command reply
pub async fn read_reply(stream: &mut TcpStream) -> [u8; 10] {
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use socksfwd::socks::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        cmd.extend_from_slice(&ip);
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let destination = Address::domain(domain, port).unwrap();
        CommandRequest::connect(destination).encode().to_vec()
    }

    /// Create a bare command with no address block
    pub fn create_command(cmd: u8) -> Vec<u8> {
        vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED]
    }
}
