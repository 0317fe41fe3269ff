//! Main SOCKS5 handler
//!
//! Drives one client connection through the handshake:
//!
//! ```text
//! Greeting -> MethodSelected -> CommandReceived -> Relaying
//!                                               \-> Rejected / Failed
//! ```
//!
//! Decode failures tear the connection down without a reply. Rejections
//! and dial failures are reported with a framed reply first.

use crate::error::{ProtocolError, ProxyError, Socks5ReplyCode};
use crate::socks::auth::{decode_greeting, encode_method_selection, MethodSelection};
use crate::socks::command::{
    decode_command_request, encode_command_reply, CommandReply, CommandRequest,
};
use crate::socks::connector::Dialer;
use crate::socks::tcp_relay::relay_tcp;
use crate::socks::types::SocksCommand;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

/// Handshake progress of a single connection
enum HandshakeState<U> {
    Greeting,
    MethodSelected,
    CommandReceived(CommandRequest),
    Relaying(U),
}

/// Handle SOCKS5 protocol on a client stream
///
/// Returns `Ok(())` once a relay has run to completion. Every other exit
/// path is an error: rejected commands and dial failures have already
/// been answered on the wire, protocol errors have not. Both streams are
/// dropped, and therefore closed, before this returns.
pub async fn handle_socks5_connection<S, D>(mut client: S, dialer: &D) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer,
{
    let mut state = HandshakeState::Greeting;

    loop {
        state = match state {
            HandshakeState::Greeting => {
                let greeting = decode_greeting(&mut client).await?;
                debug!(
                    "Greeting offered {} method(s): {:?}",
                    greeting.methods.len(),
                    greeting.methods.as_bytes()
                );

                encode_method_selection(&mut client, MethodSelection::no_auth()).await?;
                trace!("Greeting -> MethodSelected");
                HandshakeState::MethodSelected
            }

            HandshakeState::MethodSelected => {
                let request = decode_command_request(&mut client).await?;
                trace!("MethodSelected -> CommandReceived");
                HandshakeState::CommandReceived(request)
            }

            HandshakeState::CommandReceived(request) => {
                let destination = match (request.command, request.destination) {
                    (SocksCommand::Connect, Some(destination)) => destination,
                    (SocksCommand::Connect, None) => {
                        return Err(ProtocolError::TruncatedRead("address").into());
                    }
                    (command, _) => {
                        warn!("{} command not supported", command);
                        let reply = CommandReply::new(Socks5ReplyCode::CommandNotSupported);
                        encode_command_reply(&mut client, &reply).await?;
                        return Err(ProxyError::UnsupportedCommand(command.to_byte()));
                    }
                };

                info!("SOCKS5 CONNECT request to {}", destination);

                match dialer.dial(&destination.host(), destination.port()).await {
                    Ok(upstream) => {
                        let reply = CommandReply::new(Socks5ReplyCode::Succeeded);
                        encode_command_reply(&mut client, &reply).await?;
                        info!("SOCKS5 tunnel established to {}", destination);
                        HandshakeState::Relaying(upstream)
                    }
                    Err(e) => {
                        warn!("Failed to connect to {}: {}", destination, e);
                        let reply = CommandReply::new(e.reply_code());
                        encode_command_reply(&mut client, &reply).await?;
                        return Err(e.into());
                    }
                }
            }

            HandshakeState::Relaying(upstream) => {
                relay_tcp(client, upstream).await;
                debug!("Relay finished");
                return Ok(());
            }
        };
    }
}
