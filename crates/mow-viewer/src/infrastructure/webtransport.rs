//! The multiplexed transport: WebTransport over HTTP/3.
//!
//! One QUIC connection provides both delivery modes the ingest layer needs:
//!
//! - unreliable datagrams, each one a complete message;
//! - incoming unidirectional streams, one per encoded frame.
//!
//! The adapters below expose a [`wtransport::Connection`] through the
//! `MessageSource`, `SubStreamSource` and `LinkCloser` capabilities.  A
//! connection error on any of them is reported as a clean end of stream.

use std::sync::Arc;

use async_trait::async_trait;
use mow_core::ingest::{
    ConnectError, LinkCloser, MessageSource, MultiplexedLink, SubStream, SubStreamSource,
    TransportLink,
};
use tracing::debug;
use wtransport::endpoint::endpoint_side::Client;
use wtransport::{ClientConfig, Connection, Endpoint, RecvStream, VarInt};

/// Upper bound for a single sub-stream read.
const MAX_CHUNK: usize = 1 << 20;

/// Connects to `url` and returns a multiplexed link.
///
/// # Errors
///
/// Returns [`ConnectError::Rejected`] if the client endpoint cannot be bound
/// or the WebTransport session is refused.
pub async fn connect(url: &str, accept_invalid_certs: bool) -> Result<TransportLink, ConnectError> {
    let builder = ClientConfig::builder().with_bind_default();
    let config = if accept_invalid_certs {
        builder.with_no_cert_validation().build()
    } else {
        builder.with_native_certs().build()
    };

    let rejected = |reason: String| ConnectError::Rejected {
        url: url.to_string(),
        reason,
    };
    let endpoint = Endpoint::client(config).map_err(|e| rejected(e.to_string()))?;
    let connection = endpoint
        .connect(url)
        .await
        .map_err(|e| rejected(e.to_string()))?;
    debug!("webtransport session established with {url}");

    let connection = Arc::new(connection);
    Ok(TransportLink::Multiplexed(MultiplexedLink {
        datagrams: Box::new(Datagrams {
            connection: Arc::clone(&connection),
            ended: false,
        }),
        sub_streams: Box::new(UniStreams {
            connection: Arc::clone(&connection),
            ended: false,
        }),
        closer: Arc::new(SessionCloser {
            connection,
            _endpoint: endpoint,
        }),
    }))
}

/// Incoming datagrams, one message each.
struct Datagrams {
    connection: Arc<Connection>,
    ended: bool,
}

#[async_trait]
impl MessageSource for Datagrams {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        if self.ended {
            return None;
        }
        match self.connection.receive_datagram().await {
            Ok(datagram) => Some(datagram.payload().to_vec()),
            Err(e) => {
                debug!("datagram reader ended: {e}");
                self.ended = true;
                None
            }
        }
    }
}

/// Incoming unidirectional streams.
struct UniStreams {
    connection: Arc<Connection>,
    ended: bool,
}

#[async_trait]
impl SubStreamSource for UniStreams {
    async fn accept_sub_stream(&mut self) -> Option<Box<dyn SubStream>> {
        if self.ended {
            return None;
        }
        match self.connection.accept_uni().await {
            Ok(stream) => Some(Box::new(UniStream { stream })),
            Err(e) => {
                debug!("sub-stream queue ended: {e}");
                self.ended = true;
                None
            }
        }
    }
}

struct UniStream {
    stream: RecvStream,
}

#[async_trait]
impl SubStream for UniStream {
    async fn read_chunk(&mut self) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; MAX_CHUNK];
        match self.stream.read(&mut buf).await {
            Ok(Some(n)) => {
                buf.truncate(n);
                Some(buf)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("sub-stream read failed: {e}");
                None
            }
        }
    }
}

/// Closes the session.  Holds the client endpoint so its driver outlives
/// the connection.
struct SessionCloser {
    connection: Arc<Connection>,
    _endpoint: Endpoint<Client>,
}

impl LinkCloser for SessionCloser {
    fn close(&self) {
        self.connection.close(VarInt::from_u32(0), b"");
    }
}
