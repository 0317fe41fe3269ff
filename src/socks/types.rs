//! SOCKS5 type definitions
//!
//! Address model and command codes shared by the codec and the handler.

use super::consts::*;
use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// SOCKS5 command types
///
/// The command byte is recorded as received; codes outside RFC 1928 are
/// kept as [`SocksCommand::Unknown`] so the handler can reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (rejected)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (rejected)
    UdpAssociate,
    /// Any other command byte
    Unknown(u8),
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => SocksCommand::Connect,
            SOCKS5_CMD_TCP_BIND => SocksCommand::Bind,
            SOCKS5_CMD_UDP_ASSOCIATE => SocksCommand::UdpAssociate,
            other => SocksCommand::Unknown(other),
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS5_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS5_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
            SocksCommand::Unknown(byte) => byte,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
            SocksCommand::Unknown(byte) => write!(f, "UNKNOWN(0x{:02x})", byte),
        }
    }
}

/// A one-byte count followed by exactly that many bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LengthPrefixedBytes(Bytes);

impl LengthPrefixedBytes {
    /// Wrap `bytes`, failing if they do not fit a one-byte count
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_LENGTH_PREFIXED {
            return Err(ProtocolError::LengthOverflow(bytes.len()));
        }
        Ok(LengthPrefixedBytes(bytes))
    }

    /// Read a count byte and then exactly that many bytes
    pub async fn read_from<S>(stream: &mut S, field: &'static str) -> Result<Self, ProtocolError>
    where
        S: AsyncRead + Unpin,
    {
        let len = read_u8(stream, field).await?;
        let mut buf = vec![0u8; len as usize];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| ProtocolError::from_read(field, e))?;
        Ok(LengthPrefixedBytes(Bytes::from(buf)))
    }

    /// Append the count byte and the payload to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.len());
        buf.put_slice(&self.0);
    }

    /// Declared (and physical) length
    pub fn len(&self) -> u8 {
        // Bounded by `new` and `read_from`.
        self.0.len() as u8
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Destination host, selected by the ATYP tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DstAddr {
    /// IPv4 address (ATYP 0x01)
    Ipv4(Ipv4Addr),
    /// Domain name (ATYP 0x03)
    Domain(LengthPrefixedBytes),
    /// IPv6 address (ATYP 0x04)
    Ipv6(Ipv6Addr),
}

impl DstAddr {
    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        match self {
            DstAddr::Ipv4(_) => SOCKS5_ADDR_TYPE_IPV4,
            DstAddr::Domain(_) => SOCKS5_ADDR_TYPE_DOMAIN,
            DstAddr::Ipv6(_) => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Destination address of a SOCKS5 request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Host part
    pub host: DstAddr,
    /// Port, decoded from network byte order
    pub port: u16,
}

impl Address {
    /// Create a new Address from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        Address {
            host: DstAddr::Ipv4(ip),
            port,
        }
    }

    /// Create a new Address from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        Address {
            host: DstAddr::Ipv6(ip),
            port,
        }
    }

    /// Create a new Address from a domain name and port
    pub fn domain(domain: &str, port: u16) -> Result<Self, ProtocolError> {
        let name = LengthPrefixedBytes::new(Bytes::copy_from_slice(domain.as_bytes()))?;
        Ok(Address {
            host: DstAddr::Domain(name),
            port,
        })
    }

    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        self.host.addr_type()
    }

    /// Hostname or IP literal to dial
    ///
    /// Domain bytes that are not valid UTF-8 are converted lossily.
    pub fn host(&self) -> String {
        match &self.host {
            DstAddr::Ipv4(ip) => ip.to_string(),
            DstAddr::Ipv6(ip) => ip.to_string(),
            DstAddr::Domain(name) => String::from_utf8_lossy(name.as_bytes()).into_owned(),
        }
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Read ATYP, DST.ADDR and DST.PORT
    pub async fn read_from<S>(stream: &mut S) -> Result<Self, ProtocolError>
    where
        S: AsyncRead + Unpin,
    {
        let addr_type = read_u8(stream, "address type").await?;

        let host = match addr_type {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let mut addr = [0u8; 4];
                read_exact(stream, &mut addr, "IPv4 address").await?;
                DstAddr::Ipv4(Ipv4Addr::from(addr))
            }
            SOCKS5_ADDR_TYPE_DOMAIN => {
                DstAddr::Domain(LengthPrefixedBytes::read_from(stream, "domain name").await?)
            }
            SOCKS5_ADDR_TYPE_IPV6 => {
                let mut addr = [0u8; 16];
                read_exact(stream, &mut addr, "IPv6 address").await?;
                DstAddr::Ipv6(Ipv6Addr::from(addr))
            }
            other => return Err(ProtocolError::AddressTypeNotSupported(other)),
        };

        let mut port = [0u8; 2];
        read_exact(stream, &mut port, "port").await?;

        Ok(Address {
            host,
            port: u16::from_be_bytes(port),
        })
    }

    /// Serialize the address to bytes for SOCKS5 protocol
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.addr_type());
        match &self.host {
            DstAddr::Ipv4(ip) => buf.put_slice(&ip.octets()),
            DstAddr::Domain(name) => name.write_to(buf),
            DstAddr::Ipv6(ip) => buf.put_slice(&ip.octets()),
        }
        buf.put_u16(self.port);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            DstAddr::Ipv6(ip) => write!(f, "[{}]:{}", ip, self.port),
            _ => write!(f, "{}:{}", self.host(), self.port),
        }
    }
}

/// Read a single byte, classifying failures for `field`
pub(crate) async fn read_u8<S>(stream: &mut S, field: &'static str) -> Result<u8, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    stream
        .read_u8()
        .await
        .map_err(|e| ProtocolError::from_read(field, e))
}

/// Fill `buf` completely, classifying failures for `field`
pub(crate) async fn read_exact<S>(
    stream: &mut S,
    buf: &mut [u8],
    field: &'static str,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + Unpin,
{
    stream
        .read_exact(buf)
        .await
        .map(|_| ())
        .map_err(|e| ProtocolError::from_read(field, e))
}
