//! TCP relay for SOCKS5 CONNECT command
//!
//! Copies bytes between the client and the upstream once the success
//! reply has been sent.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Relay data bidirectionally between client and upstream
///
/// Upstream-to-client copying runs in a spawned task while
/// client-to-upstream copying runs in the caller's task. The relay ends as
/// soon as either direction reaches EOF or fails; the other direction is
/// then aborted and joined before both streams are dropped, so each stream
/// is closed exactly once on return.
///
/// Copy errors are only logged: the client has already been told the
/// CONNECT succeeded.
pub async fn relay_tcp<C, U>(client: C, upstream: U)
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    U: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    let mut downstream =
        tokio::spawn(async move { tokio::io::copy(&mut upstream_read, &mut client_write).await });

    let downstream_finished = tokio::select! {
        result = tokio::io::copy(&mut client_read, &mut upstream_write) => {
            match result {
                Ok(bytes) => debug!("client->upstream finished: {} bytes", bytes),
                Err(e) => debug!("client->upstream error: {}", e),
            }
            false
        }
        result = &mut downstream => {
            match result {
                Ok(Ok(bytes)) => debug!("upstream->client finished: {} bytes", bytes),
                Ok(Err(e)) => debug!("upstream->client error: {}", e),
                Err(e) => debug!("upstream->client task failed: {}", e),
            }
            true
        }
    };

    if !downstream_finished {
        downstream.abort();
        let _ = downstream.await;
    }
}
