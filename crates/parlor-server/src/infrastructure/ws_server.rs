//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from editors.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Running two concurrent tasks per connection:
//!    - **Writer**: drains the session's outbound frame queue into the
//!      WebSocket sink.
//!    - **Reader**: feeds each inbound text frame to the session's
//!      dispatcher, one at a time.
//! 5. Tearing the session down (forced leave + registry eviction) when the
//!    transport closes.
//! 6. Shutting down gracefully when the `running` flag is cleared.
//!
//! # Scheduling model
//!
//! Frames for one session are handled strictly sequentially by its reader
//! loop; handler bodies are synchronous and never hold a lock across an
//! await. Different sessions' handlers interleave freely on the Tokio
//! runtime — table state is shared behind mutexes, and membership
//! operations are last-write-wins rather than transactional across
//! sessions.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::{Directory, Session};
use crate::domain::ServerConfig;

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the main WebSocket accept loop until `running` is set to `false`.
///
/// Each accepted connection is handed off to a dedicated Tokio task so
/// that one slow client never blocks others.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(
    config: ServerConfig,
    directory: Arc<Directory>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("parlor server listening on {}", config.bind_addr);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on accept() lets the loop check the `running`
        // flag even when no editors are connecting.
        let accept_result = timeout(Duration::from_millis(200), listener.accept()).await;

        match accept_result {
            Ok(Ok((stream, peer_addr))) => {
                info!("new connection from {peer_addr}");
                let directory = Arc::clone(&directory);
                let config = config.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, directory, config).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., file descriptor exhaustion).
                // Log and continue rather than taking the whole server down.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout — no new connection in the last 200 ms.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Top-level handler for a single connection; wraps [`run_connection`] and
/// logs the outcome. The outer/inner split keeps `?` available inside
/// while the errors end up in the log here.
async fn handle_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    directory: Arc<Directory>,
    config: ServerConfig,
) {
    match run_connection(raw_stream, peer_addr, directory, config).await {
        Ok(()) => info!("connection {peer_addr} closed normally"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one connection.
///
/// # Errors
///
/// Returns an error if the WebSocket upgrade handshake fails.
async fn run_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    directory: Arc<Directory>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // The session never touches the sink directly: it queues frames on
    // this channel and the writer task drains them in order. The session's
    // handshake is therefore guaranteed to be the first frame out.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if ws_tx.send(WsMessage::Text(frame)).await.is_err() {
                debug!("connection writer: WebSocket send failed (peer disconnected)");
                break;
            }
        }
    });

    let mut session = Session::new(directory, out_tx, config.project_request_timeout);

    // Reader loop: one frame at a time, in arrival order.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(raw)) => session.handle_frame(&raw),

            Ok(WsMessage::Binary(_)) => {
                // The protocol is text-only; binary frames are unexpected.
                warn!(client = session.client_ref(), "unexpected binary frame (ignored)");
            }

            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // Protocol-level keepalive; tungstenite answers pings
                // automatically when the sink is written to.
                debug!(client = session.client_ref(), "WebSocket ping/pong");
            }

            Ok(WsMessage::Close(_)) => {
                debug!(client = session.client_ref(), "WebSocket Close frame received");
                break;
            }

            Ok(WsMessage::Frame(_)) => {
                debug!(client = session.client_ref(), "raw frame (ignored)");
            }

            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                debug!(client = session.client_ref(), "WebSocket closed");
                break;
            }

            Err(e) => {
                warn!(client = session.client_ref(), "WebSocket error: {e}");
                break;
            }
        }
    }

    // Forced leave + eviction; pending content requests are abandoned.
    session.on_close();

    // Dropping the session releases the last outbox sender, which ends the
    // writer task once the queue is drained.
    drop(session);
    let _ = writer_task.await;

    Ok(())
}
