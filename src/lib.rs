//! # socksfwd - Minimal SOCKS5 CONNECT proxy
//!
//! socksfwd accepts SOCKS5 clients, negotiates "no authentication
//! required", fulfils CONNECT requests by dialing the destination and then
//! relays bytes in both directions until either side closes. BIND and UDP
//! ASSOCIATE are recognized and rejected.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksfwd::config::load_config;
//! use socksfwd::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("socksfwd.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(config, shutdown_rx).await
//! }
//! ```
//!
//! ## Reverse proxy
//!
//! When `reverse_proxy` is configured every CONNECT is dialed to that
//! target instead of the requested destination:
//!
//! ```text
//! SOCKS5 Client -> socksfwd -> reverse_proxy target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{DialError, DialErrorKind, ProtocolError, ProxyError, Socks5ReplyCode};
pub use server::{run_server, Server};

/// Version of the socksfwd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
