//! WebSocket server: accept loop and per-session feed task.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Terminating TLS on each accepted connection (`tokio-rustls`, using the
//!    same self-signed certificate as the WebTransport server).
//! 3. Upgrading the TLS stream to a WebSocket session.
//! 4. Pumping the configured feed, one binary message per payload.  TCP keeps
//!    them ordered and reliable, so no pacing beyond the feed's own is needed.
//! 5. Gracefully shutting down when the `running` flag is cleared.
//!
//! Each session runs in its own Tokio task; the accept loop never waits on a
//! handshake.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::application::{pump, send_failed, Feed, FeedError, PayloadOut};

/// How often an idle accept loop re-checks the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Binds the WebSocket TCP listener.
///
/// # Errors
///
/// Returns an error if the port is already in use or the process lacks
/// permission to bind.
pub async fn bind_websocket(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))?;
    let local = listener.local_addr().unwrap_or(addr);
    info!("WebSocket feeder listening on {local}");
    Ok(listener)
}

/// Accepts connections on `listener` until `running` is cleared.
pub async fn serve_websocket(
    listener: TcpListener,
    tls: Arc<rustls::ServerConfig>,
    feed: Arc<Feed>,
    running: Arc<AtomicBool>,
) {
    let acceptor = TlsAcceptor::from(tls);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping WebSocket accept loop");
            break;
        }

        // Short timeout so an idle loop still notices the shutdown flag.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new WebSocket connection from {peer_addr}");
                let acceptor = acceptor.clone();
                let feed = Arc::clone(&feed);
                let running = Arc::clone(&running);
                tokio::spawn(async move {
                    handle_session(acceptor, stream, peer_addr, feed, running).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_elapsed) => continue,
        }
    }
}

// ── Session handling ──────────────────────────────────────────────────────────

async fn handle_session(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer_addr: SocketAddr,
    feed: Arc<Feed>,
    running: Arc<AtomicBool>,
) {
    match run_session(acceptor, stream, &feed, &running).await {
        Ok(sent) => info!("WebSocket session {peer_addr} finished after {sent} payloads"),
        Err(e) => warn!("WebSocket session {peer_addr} ended: {e:#}"),
    }
}

async fn run_session(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    feed: &Feed,
    running: &AtomicBool,
) -> anyhow::Result<u64> {
    let tls_stream = acceptor.accept(stream).await.context("TLS handshake failed")?;
    let mut socket = accept_async(tls_stream)
        .await
        .context("WebSocket handshake failed")?;

    let result = pump(feed, &mut SocketOut(&mut socket), running).await;

    // A peer that already left cannot be closed politely; that is fine.
    if let Err(e) = socket.close(None).await {
        debug!("WebSocket close: {e}");
    }
    Ok(result?)
}

/// One binary message per payload.
struct SocketOut<'a, S>(&'a mut WebSocketStream<S>);

#[async_trait]
impl<'a, S> PayloadOut for SocketOut<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, payload: &[u8]) -> Result<(), FeedError> {
        self.0
            .send(WsMessage::Binary(payload.to_vec()))
            .await
            .map_err(send_failed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
