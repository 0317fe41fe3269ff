//! SOCKS5 module for socksfwd
//!
//! This module implements the server side of the SOCKS5 protocol: the
//! wire codec, the per-connection handshake, the upstream connector and
//! the relay.

mod auth;
mod command;
mod connector;
mod consts;
mod handler;
mod tcp_relay;
mod types;

pub use auth::{
    decode_greeting, decode_method_selection, encode_method_selection, Greeting, MethodSelection,
};
pub use command::{
    decode_command_reply, decode_command_request, encode_command_reply, CommandReply,
    CommandRequest,
};
pub use connector::{Dialer, ReverseProxy, SocketOpts, TcpConnector, DEFAULT_CONNECT_TIMEOUT};
pub use consts::*;
pub use handler::handle_socks5_connection;
pub use tcp_relay::relay_tcp;
pub use types::{Address, DstAddr, LengthPrefixedBytes, SocksCommand};
