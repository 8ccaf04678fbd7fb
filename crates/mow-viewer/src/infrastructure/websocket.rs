//! The ordered-byte transport: WebSocket over TLS.
//!
//! tokio-tungstenite already delimits messages, so every binary message is
//! one payload.  The socket is read by a pump task that feeds a push queue:
//!
//! ```text
//! WebSocketStream ──pump task──▶ EventPusher ══ queue ══▶ EventQueue (MessageSource)
//!                      ▲
//!        close() ──────┘ (Notify)
//! ```
//!
//! Text messages are ignored; ping/pong is answered by tungstenite itself.

use std::sync::Arc;

use futures_util::StreamExt;
use mow_core::ingest::{
    push_queue, ConnectError, EventPusher, LinkCloser, LinkEvent, OrderedByteLink, TransportLink,
};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::infrastructure::tls::insecure_client_config;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to `url` and returns an ordered-byte link.
///
/// # Errors
///
/// Returns [`ConnectError::Rejected`] if the TLS or WebSocket handshake
/// fails, and [`ConnectError::ClosedBeforeOpen`] if the socket ends before
/// the pump reports it open.
pub async fn connect(
    url: &str,
    accept_invalid_certs: bool,
    queue_capacity: usize,
) -> Result<TransportLink, ConnectError> {
    let rejected = |reason: String| ConnectError::Rejected {
        url: url.to_string(),
        reason,
    };

    let connector = if accept_invalid_certs {
        let config = insecure_client_config().map_err(|e| rejected(e.to_string()))?;
        Some(tokio_tungstenite::Connector::Rustls(config))
    } else {
        None
    };
    let (socket, response) =
        tokio_tungstenite::connect_async_tls_with_config(url, None, false, connector)
            .await
            .map_err(|e| rejected(e.to_string()))?;
    debug!("websocket handshake with {url}: {}", response.status());

    let (pusher, mut queue) = push_queue(queue_capacity);
    let stop = Arc::new(Notify::new());
    tokio::spawn(pump(socket, pusher, Arc::clone(&stop)));

    if !queue.wait_open().await {
        return Err(ConnectError::ClosedBeforeOpen {
            url: url.to_string(),
        });
    }

    Ok(TransportLink::OrderedByte(OrderedByteLink {
        messages: Box::new(queue),
        closer: Arc::new(SocketCloser { stop }),
    }))
}

/// Moves socket events into the queue until either side goes away.
async fn pump(mut socket: Socket, pusher: EventPusher, stop: Arc<Notify>) {
    if !pusher.push(LinkEvent::Open).await {
        return;
    }

    loop {
        let next = tokio::select! {
            next = socket.next() => next,
            _ = stop.notified() => {
                if let Err(e) = socket.close(None).await {
                    debug!("websocket close handshake failed: {e}");
                }
                break;
            }
        };

        match next {
            Some(Ok(Message::Binary(data))) => {
                if !pusher.push(LinkEvent::Message(data)).await {
                    break;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                debug!("websocket closed by peer: {frame:?}");
                break;
            }
            Some(Ok(Message::Text(_))) => debug!("ignoring websocket text message"),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("websocket read failed: {e}");
                break;
            }
            None => break,
        }
    }

    pusher.push(LinkEvent::Closed).await;
}

/// Signals the pump to send a close frame and stop.
struct SocketCloser {
    stop: Arc<Notify>,
}

impl LinkCloser for SocketCloser {
    fn close(&self) {
        self.stop.notify_one();
    }
}
