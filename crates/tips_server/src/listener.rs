//! TCP listener.
//!
//! Connections carry newline-delimited JSON. Requests on one connection
//! are answered in order; each runs on the blocking pool since a pull may
//! wait for its full timeout.
//!
//! Every request gets its own cancel token under the server's shutdown
//! token. While a request runs the connection keeps reading, so a client
//! that hangs up cancels its pull instead of holding a worker and a
//! connection slot until the timeout. Requests already received are still
//! answered after a half-close, without blocking.

use crate::error::ServerResult;
use crate::server::TipsServer;
use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Binds the server's configured address.
pub async fn bind(server: &TipsServer) -> ServerResult<TcpListener> {
    let listener = TcpListener::bind(server.config().bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    Ok(listener)
}

/// Accepts connections until `shutdown` resolves.
///
/// On shutdown the server's cancel token fires so blocked pulls return
/// empty results and their connections can drain.
pub async fn serve<F>(server: Arc<TipsServer>, listener: TcpListener, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()>,
{
    let permits = Arc::new(Semaphore::new(server.config().max_connections));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                server.shutdown();
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                    tracing::warn!(%peer, "connection limit reached, dropping connection");
                    continue;
                };
                let server = Arc::clone(&server);
                tokio::spawn(async move {
                    tracing::debug!(%peer, "connection opened");
                    if let Err(err) = handle_connection(server, stream, peer).await {
                        tracing::debug!(%peer, error = %err, "connection failed");
                    }
                    tracing::debug!(%peer, "connection closed");
                    drop(permit);
                });
            }
        }
    }
}

async fn handle_connection(
    server: Arc<TipsServer>,
    stream: TcpStream,
    peer: SocketAddr,
) -> ServerResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    // Lines read ahead while an earlier request was running.
    let mut pending = VecDeque::new();
    let mut eof = false;

    loop {
        let line = match pending.pop_front() {
            Some(line) => line,
            None if eof => return Ok(()),
            None => match lines.next_line().await? {
                Some(line) => line,
                None => return Ok(()),
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        tracing::trace!(%peer, bytes = line.len(), "request line");

        let token = server.request_token();
        if eof {
            token.cancel();
        }
        let mut task = tokio::task::spawn_blocking({
            let server = Arc::clone(&server);
            let token = token.clone();
            move || server.handle_line_with(&line, token)
        });

        let joined = loop {
            tokio::select! {
                joined = &mut task => break joined,
                next = lines.next_line(), if !eof => match next {
                    Ok(Some(line)) => pending.push_back(line),
                    Ok(None) | Err(_) => {
                        tracing::debug!(%peer, "client hung up, cancelling request");
                        eof = true;
                        token.cancel();
                    }
                },
            }
        };
        let mut reply = joined.map_err(std::io::Error::other)?;
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
    }
}
