//! Transport capability traits.
//!
//! The two backends deliver data in structurally different ways:
//!
//! ```text
//! Multiplexed  ─┬─ datagrams ............ one message per packet
//!               └─ uni sub-streams ...... one ordered byte channel per unit
//! OrderedByte  ─── binary messages ...... one message per WebSocket frame
//! ```
//!
//! Instead of one copy of the read loop per backend, each backend is reduced
//! to a handful of pull-style capabilities ([`MessageSource`],
//! [`SubStreamSource`], [`LinkCloser`]) bundled into a [`TransportLink`].  The
//! concrete QUIC / WebSocket adapters live in the viewer's infrastructure
//! layer; this crate never touches a socket.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Endpoint, TransportKind};

/// Errors that keep a session from ever reaching `Open`.
///
/// These are the only errors the ingest layer produces.  They are returned
/// from `connect` unchanged and are never retried here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The endpoint host is empty or malformed.
    #[error("invalid endpoint host: {0:?}")]
    InvalidEndpoint(String),

    /// The underlying transport refused or failed the connection.
    #[error("connection to {url} rejected: {reason}")]
    Rejected { url: String, reason: String },

    /// The transport reported closure before it ever became ready.
    #[error("connection to {url} closed before it opened")]
    ClosedBeforeOpen { url: String },
}

/// A source of already-delimited binary messages.
///
/// Implemented over transport datagrams and over whole WebSocket binary
/// messages.  `None` means the source has closed; it is a clean end of stream,
/// never an error, and every later call must also return `None`.
#[async_trait]
pub trait MessageSource: Send {
    async fn next_message(&mut self) -> Option<Vec<u8>>;
}

#[async_trait]
impl<T: MessageSource + ?Sized> MessageSource for Box<T> {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        (**self).next_message().await
    }
}

/// One incoming unidirectional ordered byte channel.
#[async_trait]
pub trait SubStream: Send {
    /// Returns the next chunk the transport has available, or `None` once the
    /// sub-stream finished or was reset.
    async fn read_chunk(&mut self) -> Option<Vec<u8>>;
}

/// The transport's queue of incoming unidirectional sub-streams.
#[async_trait]
pub trait SubStreamSource: Send {
    /// Suspends until a new sub-stream arrives.  `None` once the queue closed.
    async fn accept_sub_stream(&mut self) -> Option<Box<dyn SubStream>>;
}

#[async_trait]
impl<T: SubStreamSource + ?Sized> SubStreamSource for Box<T> {
    async fn accept_sub_stream(&mut self) -> Option<Box<dyn SubStream>> {
        (**self).accept_sub_stream().await
    }
}

/// Closes the underlying transport.
///
/// Closing must unblock every pending read on the link, which then reports
/// end-of-stream.  Implementations may be called from any task.
pub trait LinkCloser: Send + Sync {
    fn close(&self);
}

/// A connected multiplexed transport.
pub struct MultiplexedLink {
    /// Unreliable datagrams, one message each.
    pub datagrams: Box<dyn MessageSource>,
    /// Incoming unidirectional sub-streams.
    pub sub_streams: Box<dyn SubStreamSource>,
    pub closer: Arc<dyn LinkCloser>,
}

/// A connected ordered-byte transport.
pub struct OrderedByteLink {
    /// Whole binary messages in arrival order.
    pub messages: Box<dyn MessageSource>,
    pub closer: Arc<dyn LinkCloser>,
}

/// A ready transport of either shape.
pub enum TransportLink {
    Multiplexed(MultiplexedLink),
    OrderedByte(OrderedByteLink),
}

impl TransportLink {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportLink::Multiplexed(_) => TransportKind::Multiplexed,
            TransportLink::OrderedByte(_) => TransportKind::OrderedByte,
        }
    }

    /// Returns a handle that closes this link.
    pub fn closer(&self) -> Arc<dyn LinkCloser> {
        match self {
            TransportLink::Multiplexed(link) => Arc::clone(&link.closer),
            TransportLink::OrderedByte(link) => Arc::clone(&link.closer),
        }
    }
}

/// Establishes transport links.
///
/// `connect` suspends until the transport signals readiness and returns a link
/// of the requested kind, or the transport's rejection.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        kind: TransportKind,
    ) -> Result<TransportLink, ConnectError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        kind: TransportKind,
    ) -> Result<TransportLink, ConnectError> {
        (**self).connect(endpoint, kind).await
    }
}
