//! SOCKS5 reply builder
//!
//! Writes SOCKS5 command replies. The bound address is always reported
//! as IPv4; no real bind address is tracked.

use crate::error::{ProtocolError, Socks5ReplyCode};
use crate::socks::consts::*;
use crate::socks::types::{read_exact, read_u8};
use bytes::{BufMut, BytesMut};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// A command reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandReply {
    /// Reply status code
    pub reply: Socks5ReplyCode,
    /// Reported bound address
    pub bound: SocketAddrV4,
}

impl CommandReply {
    /// Reply with the zero address `0.0.0.0:0`
    pub fn new(reply: Socks5ReplyCode) -> Self {
        CommandReply {
            reply,
            bound: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
        }
    }

    /// Serialize the reply
    ///
    /// ```text
    /// +----+-----+-------+------+----------+----------+
    /// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
    /// +----+-----+-------+------+----------+----------+
    /// | 1  |  1  | X'00' |  1   |    4     |    2     |
    /// +----+-----+-------+------+----------+----------+
    /// ```
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(SOCKS5_REPLY_LEN);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.reply.into());
        buf.put_u8(SOCKS5_RESERVED);
        buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
        buf.put_slice(&self.bound.ip().octets());
        buf.put_u16(self.bound.port());
        buf
    }
}

/// Write a command reply and flush it
pub async fn encode_command_reply<S>(stream: &mut S, reply: &CommandReply) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&reply.encode()).await?;
    stream.flush().await
}

/// Read a command reply (client side)
///
/// Only the IPv4 form this server emits is understood.
pub async fn decode_command_reply<S>(stream: &mut S) -> Result<CommandReply, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    let version = read_u8(stream, "version").await?;
    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let code = read_u8(stream, "reply code").await?;
    let reply = Socks5ReplyCode::try_from(code).map_err(ProtocolError::UnknownReplyCode)?;
    let _reserved = read_u8(stream, "reserved").await?;

    let addr_type = read_u8(stream, "address type").await?;
    if addr_type != SOCKS5_ADDR_TYPE_IPV4 {
        return Err(ProtocolError::AddressTypeNotSupported(addr_type));
    }

    let mut addr = [0u8; 4];
    read_exact(stream, &mut addr, "bound address").await?;
    let mut port = [0u8; 2];
    read_exact(stream, &mut port, "bound port").await?;

    Ok(CommandReply {
        reply,
        bound: SocketAddrV4::new(Ipv4Addr::from(addr), u16::from_be_bytes(port)),
    })
}
