//! WebTransport server: accept loop and per-session feed task.
//!
//! This module is responsible for:
//!
//! 1. Binding a QUIC endpoint with the feeder's self-signed identity.
//! 2. Accepting WebTransport session requests.
//! 3. Running one Tokio task per session that pumps the configured feed:
//!    - **Counter**: one unreliable datagram per value, then a short linger
//!      so the tail is not cut off, then an application close.
//!    - **Video**: one unidirectional stream per access unit; the stream is
//!      written in full and finished before the next one opens.
//! 4. Stopping the accept loop when the `running` flag is cleared.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use wtransport::endpoint::endpoint_side::Server;
use wtransport::endpoint::IncomingSession;
use wtransport::{Connection, Endpoint, Identity, ServerConfig, VarInt};

use crate::application::{pump, send_failed, Feed, FeedError, PayloadOut};

/// How often an idle accept loop re-checks the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Binds the WebTransport endpoint.
///
/// # Errors
///
/// Returns an error if the UDP socket cannot be bound.
pub fn bind_webtransport(addr: SocketAddr, identity: Identity) -> anyhow::Result<Endpoint<Server>> {
    let config = ServerConfig::builder()
        .with_bind_address(addr)
        .with_identity(identity)
        .build();

    let endpoint = Endpoint::server(config)
        .with_context(|| format!("failed to bind WebTransport endpoint on {addr}"))?;

    let local = endpoint.local_addr().unwrap_or(addr);
    info!("WebTransport feeder listening on {local}");
    Ok(endpoint)
}

/// Accepts sessions on `endpoint` until `running` is cleared.
///
/// Each session runs in its own task with the shared `feed`.
pub async fn serve_webtransport(
    endpoint: Endpoint<Server>,
    feed: Arc<Feed>,
    linger: Duration,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping WebTransport accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, endpoint.accept()).await {
            Ok(incoming) => {
                let feed = Arc::clone(&feed);
                let running = Arc::clone(&running);
                tokio::spawn(async move {
                    handle_session(incoming, feed, linger, running).await;
                });
            }
            Err(_elapsed) => continue,
        }
    }
}

// ── Session handling ──────────────────────────────────────────────────────────

async fn handle_session(
    incoming: IncomingSession,
    feed: Arc<Feed>,
    linger: Duration,
    running: Arc<AtomicBool>,
) {
    match run_session(incoming, &feed, linger, &running).await {
        Ok(sent) => info!("WebTransport session finished after {sent} payloads"),
        Err(e) => warn!("WebTransport session ended: {e:#}"),
    }
}

async fn run_session(
    incoming: IncomingSession,
    feed: &Feed,
    linger: Duration,
    running: &AtomicBool,
) -> anyhow::Result<u64> {
    let request = incoming.await.context("QUIC handshake failed")?;
    info!(
        "WebTransport session request: authority={} path={}",
        request.authority(),
        request.path()
    );
    let connection = request
        .accept()
        .await
        .context("failed to accept WebTransport session")?;
    let peer = connection.remote_address();

    let sent = match feed {
        Feed::Counter { .. } => {
            let sent = pump(feed, &mut DatagramOut(&connection), running).await?;
            debug!("{peer}: {sent} datagrams sent; lingering {linger:?}");
            tokio::time::sleep(linger).await;
            connection.close(VarInt::from_u32(0), b"done");
            sent
        }
        Feed::Video { .. } => pump(feed, &mut UniStreamOut(&connection), running).await?,
    };
    Ok(sent)
}

/// One datagram per payload.
struct DatagramOut<'a>(&'a Connection);

#[async_trait]
impl<'a> PayloadOut for DatagramOut<'a> {
    async fn send(&mut self, payload: &[u8]) -> Result<(), FeedError> {
        self.0.send_datagram(payload).map_err(send_failed)
    }
}

/// One finished unidirectional stream per payload.
struct UniStreamOut<'a>(&'a Connection);

#[async_trait]
impl<'a> PayloadOut for UniStreamOut<'a> {
    async fn send(&mut self, payload: &[u8]) -> Result<(), FeedError> {
        let mut stream = self
            .0
            .open_uni()
            .await
            .map_err(send_failed)?
            .await
            .map_err(send_failed)?;
        stream.write_all(payload).await.map_err(send_failed)?;
        stream.finish().await.map_err(send_failed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::default_certificate_names;
    use crate::infrastructure::identity::ServerIdentity;

    #[tokio::test]
    async fn test_bind_on_ephemeral_port_reports_a_real_port() {
        // Arrange
        let identity = ServerIdentity::self_signed(&default_certificate_names()).unwrap();

        // Act
        let endpoint = bind_webtransport(
            "127.0.0.1:0".parse().unwrap(),
            identity.webtransport_identity(),
        )
        .unwrap();

        // Assert
        assert_ne!(endpoint.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_accept_loop_exits_when_running_is_cleared() {
        // Arrange: flag already cleared
        let identity = ServerIdentity::self_signed(&default_certificate_names()).unwrap();
        let endpoint = bind_webtransport(
            "127.0.0.1:0".parse().unwrap(),
            identity.webtransport_identity(),
        )
        .unwrap();
        let running = Arc::new(AtomicBool::new(false));

        // Act / Assert: returns instead of waiting for sessions
        timeout(
            Duration::from_secs(2),
            serve_webtransport(
                endpoint,
                Arc::new(Feed::Counter { max_value: 1 }),
                Duration::ZERO,
                running,
            ),
        )
        .await
        .expect("accept loop should stop");
    }
}
