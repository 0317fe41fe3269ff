//! SOCKS5 method negotiation
//!
//! Greeting and method-selection messages. Only "no authentication
//! required" is ever selected.

use super::consts::*;
use super::types::{read_u8, LengthPrefixedBytes};
use crate::error::ProtocolError;
use bytes::{BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Client greeting offering authentication methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Offered method identifiers
    pub methods: LengthPrefixedBytes,
}

impl Greeting {
    /// Serialize the greeting (client side)
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(2 + self.methods.len() as usize);
        buf.put_u8(SOCKS5_VERSION);
        self.methods.write_to(&mut buf);
        buf
    }
}

/// Server's chosen authentication method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSelection {
    /// Selected method identifier
    pub method: u8,
}

impl MethodSelection {
    /// Select "no authentication required"
    pub fn no_auth() -> Self {
        MethodSelection {
            method: SOCKS5_AUTH_METHOD_NONE,
        }
    }
}

/// Read a client greeting
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 0 to 255 |
/// +----+----------+----------+
/// ```
///
/// Fails on a version other than 5 without consuming anything past the
/// version byte.
pub async fn decode_greeting<S>(stream: &mut S) -> Result<Greeting, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    let version = read_u8(stream, "version").await?;
    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let methods = LengthPrefixedBytes::read_from(stream, "methods").await?;

    Ok(Greeting { methods })
}

/// Write a method selection and flush it
pub async fn encode_method_selection<S>(stream: &mut S, selection: MethodSelection) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&[SOCKS5_VERSION, selection.method]).await?;
    stream.flush().await
}

/// Read a method selection (client side)
pub async fn decode_method_selection<S>(stream: &mut S) -> Result<MethodSelection, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    let version = read_u8(stream, "version").await?;
    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let method = read_u8(stream, "method").await?;
    Ok(MethodSelection { method })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_decode_greeting() {
        let mut cursor = Cursor::new(vec![
            SOCKS5_VERSION,
            2,
            SOCKS5_AUTH_METHOD_NONE,
            SOCKS5_AUTH_METHOD_PASSWORD,
        ]);
        let greeting = decode_greeting(&mut cursor).await.unwrap();
        assert_eq!(
            greeting.methods.as_bytes(),
            &[SOCKS5_AUTH_METHOD_NONE, SOCKS5_AUTH_METHOD_PASSWORD]
        );
    }

    #[tokio::test]
    async fn test_decode_greeting_without_methods() {
        let mut cursor = Cursor::new(vec![SOCKS5_VERSION, 0]);
        let greeting = decode_greeting(&mut cursor).await.unwrap();
        assert!(greeting.methods.is_empty());
    }

    #[tokio::test]
    async fn test_decode_greeting_rejects_other_versions() {
        for version in [0u8, 4, 6, 0xFF] {
            let mut cursor = Cursor::new(vec![version, 1, SOCKS5_AUTH_METHOD_NONE]);
            let result = decode_greeting(&mut cursor).await;

            assert!(matches!(result, Err(ProtocolError::UnsupportedVersion(v)) if v == version));
            assert_eq!(cursor.position(), 1);
        }
    }

    #[tokio::test]
    async fn test_decode_greeting_truncated_methods() {
        let mut cursor = Cursor::new(vec![SOCKS5_VERSION, 3, SOCKS5_AUTH_METHOD_NONE]);
        let result = decode_greeting(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::TruncatedRead("methods"))));
    }

    #[tokio::test]
    async fn test_decode_greeting_empty_stream() {
        let mut cursor = Cursor::new(Vec::new());
        let result = decode_greeting(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::TruncatedRead("version"))));
    }

    #[tokio::test]
    async fn test_encode_method_selection_flushes() {
        let mut mock = tokio_test::io::Builder::new()
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .build();

        encode_method_selection(&mut mock, MethodSelection::no_auth())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_encode_method_selection_reports_write_error() {
        let mut mock = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();

        let result = encode_method_selection(&mut mock, MethodSelection::no_auth()).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_greeting_round_trip() {
        let greeting = Greeting {
            methods: LengthPrefixedBytes::new(vec![0x00, 0x02, 0x80]).unwrap(),
        };
        let encoded = greeting.encode();

        let decoded = decode_greeting(&mut Cursor::new(encoded.to_vec()))
            .await
            .unwrap();
        assert_eq!(decoded, greeting);
    }
}
