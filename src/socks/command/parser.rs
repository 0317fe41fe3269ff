//! SOCKS5 command parser
//!
//! Parses SOCKS5 command requests from the client.

use crate::error::ProtocolError;
use crate::socks::consts::*;
use crate::socks::types::{read_u8, Address, SocksCommand};
use bytes::{BufMut, BytesMut};
use tokio::io::AsyncRead;

/// A parsed command request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Requested command, recorded as received
    pub command: SocksCommand,
    /// Reserved byte as received
    pub reserved: u8,
    /// Destination, present only for CONNECT
    pub destination: Option<Address>,
}

impl CommandRequest {
    /// Build a CONNECT request
    pub fn connect(destination: Address) -> Self {
        CommandRequest {
            command: SocksCommand::Connect,
            reserved: SOCKS5_RESERVED,
            destination: Some(destination),
        }
    }

    /// Serialize the request (client side)
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.command.to_byte());
        buf.put_u8(self.reserved);
        if let Some(destination) = &self.destination {
            destination.write_to(&mut buf);
        }
        buf
    }
}

/// Parse a SOCKS5 command request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// The address block is read only for CONNECT. For every other command
/// nothing past RSV is consumed, so the caller can reject the request
/// without waiting on further bytes.
pub async fn decode_command_request<S>(stream: &mut S) -> Result<CommandRequest, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    let version = read_u8(stream, "version").await?;
    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let command = SocksCommand::from_byte(read_u8(stream, "command").await?);
    let reserved = read_u8(stream, "reserved").await?;

    let destination = match command {
        SocksCommand::Connect => Some(Address::read_from(stream).await?),
        _ => None,
    };

    tracing::debug!("Parsed SOCKS5 command: {}", command);

    Ok(CommandRequest {
        command,
        reserved,
        destination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn create_connect_request_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut request = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        request.extend_from_slice(&ip);
        request.extend_from_slice(&port.to_be_bytes());
        request
    }

    fn create_connect_request_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut request = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        request.extend_from_slice(domain.as_bytes());
        request.extend_from_slice(&port.to_be_bytes());
        request
    }

    #[tokio::test]
    async fn test_parse_command_ipv4() {
        let request = create_connect_request_ipv4([127, 0, 0, 1], 8080);
        let mut cursor = Cursor::new(request);

        let parsed = decode_command_request(&mut cursor).await.unwrap();

        assert_eq!(parsed.command, SocksCommand::Connect);
        assert_eq!(
            parsed.destination,
            Some(Address::ipv4(Ipv4Addr::new(127, 0, 0, 1), 8080))
        );
    }

    #[tokio::test]
    async fn test_parse_command_domain() {
        let request = create_connect_request_domain("example.com", 443);
        let mut cursor = Cursor::new(request);

        let parsed = decode_command_request(&mut cursor).await.unwrap();
        let destination = parsed.destination.unwrap();

        assert_eq!(destination.host(), "example.com");
        assert_eq!(destination.port(), 443);
    }

    #[tokio::test]
    async fn test_parse_command_ipv6() {
        let mut request = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV6,
        ];
        request.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        request.extend_from_slice(&80u16.to_be_bytes());

        let parsed = decode_command_request(&mut Cursor::new(request))
            .await
            .unwrap();

        assert_eq!(
            parsed.destination,
            Some(Address::ipv6(Ipv6Addr::LOCALHOST, 80))
        );
    }

    #[tokio::test]
    async fn test_parse_command_invalid_version() {
        let mut request = create_connect_request_ipv4([127, 0, 0, 1], 80);
        request[0] = 4;

        let mut cursor = Cursor::new(request);
        let result = decode_command_request(&mut cursor).await;

        assert!(matches!(result, Err(ProtocolError::UnsupportedVersion(4))));
        assert_eq!(cursor.position(), 1);
    }

    #[tokio::test]
    async fn test_parse_non_connect_reads_no_address() {
        for cmd in [SOCKS5_CMD_TCP_BIND, SOCKS5_CMD_UDP_ASSOCIATE, 0x99] {
            let mut request = create_connect_request_ipv4([10, 0, 0, 1], 80);
            request[1] = cmd;

            let mut cursor = Cursor::new(request);
            let parsed = decode_command_request(&mut cursor).await.unwrap();

            assert_eq!(parsed.command, SocksCommand::from_byte(cmd));
            assert!(parsed.destination.is_none());
            assert_eq!(cursor.position(), 3);
        }
    }

    #[tokio::test]
    async fn test_parse_bind_with_nothing_after_reserved() {
        let mut cursor = Cursor::new(vec![SOCKS5_VERSION, SOCKS5_CMD_TCP_BIND, SOCKS5_RESERVED]);
        let parsed = decode_command_request(&mut cursor).await.unwrap();
        assert_eq!(parsed.command, SocksCommand::Bind);
    }

    #[tokio::test]
    async fn test_parse_command_truncated_domain() {
        let mut request = create_connect_request_domain("example.com", 443);
        request.truncate(9);

        let result = decode_command_request(&mut Cursor::new(request)).await;
        assert!(matches!(result, Err(ProtocolError::TruncatedRead("domain name"))));
    }

    #[tokio::test]
    async fn test_connect_request_round_trip() {
        let request = CommandRequest::connect(Address::domain("example.org", 8443).unwrap());
        let encoded = request.encode();

        let decoded = decode_command_request(&mut Cursor::new(encoded.to_vec()))
            .await
            .unwrap();
        assert_eq!(decoded, request);
    }
}
