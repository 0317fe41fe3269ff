//! Error types for socksfwd
//!
//! This module defines the error taxonomy used by the SOCKS5 codec, the
//! upstream connector and the per-connection handler.

use std::fmt;
use std::io;
use thiserror::Error;

/// Per-connection error type
///
/// Every exit path of a SOCKS5 connection other than a completed relay is
/// described by one of these variants. None of them affects other
/// connections.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error while writing a reply
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or truncated client input
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Upstream dial failed (already reported to the client)
    #[error("Dial error: {0}")]
    Dial(#[from] DialError),

    /// BIND, UDP ASSOCIATE or an unknown command (already rejected)
    #[error("Command not supported: {0}")]
    UnsupportedCommand(u8),
}

/// Errors raised while decoding SOCKS5 messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Stream ended before a field was complete
    #[error("Truncated read of {0}")]
    TruncatedRead(&'static str),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Reply code outside RFC 1928
    #[error("Unknown reply code: {0}")]
    UnknownReplyCode(u8),

    /// Length-prefixed field longer than 255 bytes
    #[error("Length-prefixed field too long: {0} bytes")]
    LengthOverflow(usize),

    /// Any other IO failure while reading a field
    #[error("Failed to read {field}: {source}")]
    Io {
        /// Name of the field being read
        field: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl ProtocolError {
    /// Classify an IO error raised while reading `field`
    pub fn from_read(field: &'static str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::TruncatedRead(field)
        } else {
            ProtocolError::Io { field, source: err }
        }
    }
}

/// Coarse classification of upstream dial failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialErrorKind {
    /// Name resolution failed or returned no addresses
    ResolutionFailure,
    /// The dial did not complete within the connect timeout
    Timeout,
    /// Any other dial error (refused, unreachable, ...)
    Other,
}

impl DialErrorKind {
    /// Reply code reported to the client for this kind of failure
    pub fn reply_code(self) -> Socks5ReplyCode {
        match self {
            DialErrorKind::ResolutionFailure => Socks5ReplyCode::HostUnreachable,
            DialErrorKind::Timeout => Socks5ReplyCode::HostUnreachable,
            DialErrorKind::Other => Socks5ReplyCode::GeneralFailure,
        }
    }
}

impl fmt::Display for DialErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialErrorKind::ResolutionFailure => write!(f, "name resolution failed"),
            DialErrorKind::Timeout => write!(f, "connect timed out"),
            DialErrorKind::Other => write!(f, "connect failed"),
        }
    }
}

/// Upstream dial failure
#[derive(Error, Debug)]
#[error("{kind} for {target}")]
pub struct DialError {
    kind: DialErrorKind,
    target: String,
    #[source]
    source: Option<io::Error>,
}

impl DialError {
    /// Create a dial error without an underlying cause
    pub fn new(kind: DialErrorKind, target: impl Into<String>) -> Self {
        DialError {
            kind,
            target: target.into(),
            source: None,
        }
    }

    /// Create a dial error wrapping an IO error
    pub fn with_source(kind: DialErrorKind, target: impl Into<String>, source: io::Error) -> Self {
        DialError {
            kind,
            target: target.into(),
            source: Some(source),
        }
    }

    /// Classify a failed connect attempt.
    ///
    /// Only an OS-level timeout is singled out; everything else lands in
    /// [`DialErrorKind::Other`].
    pub fn from_connect(target: impl Into<String>, err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut => DialErrorKind::Timeout,
            _ => DialErrorKind::Other,
        };
        DialError::with_source(kind, target, err)
    }

    /// Failure classification
    pub fn kind(&self) -> DialErrorKind {
        self.kind
    }

    /// The `host:port` that was being dialed
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Reply code reported to the client
    pub fn reply_code(&self) -> Socks5ReplyCode {
        self.kind.reply_code()
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            other => Err(other),
        }
    }
}
