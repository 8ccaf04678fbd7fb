//! The top-level session state machine.
//!
//! A [`TransportSession`] owns connection setup and the read loop:
//!
//! ```text
//!   connect(endpoint, kind)                 run(session, sink)
//!   ───────────────────────                 ──────────────────
//!   Connecting ──transport ready──▶ Open ──reader ends / close()──▶ Closed
//! ```
//!
//! # Reader selection
//!
//! | transport   | feed    | reader                                   |
//! |-------------|---------|------------------------------------------|
//! | Multiplexed | Counter | [`DatagramChannel`] over datagrams       |
//! | Multiplexed | Video   | [`StreamReassembler`] over sub-streams   |
//! | OrderedByte | any     | [`DatagramChannel`] over binary messages |
//!
//! # Concurrency
//!
//! Exactly one read loop runs per session and it reads sequentially.  It
//! suspends at every "await next message / sub-stream / chunk" point and
//! resumes when data arrives.  Closing the session is the only cancellation
//! mechanism: it wakes a pending suspension and ends the loop without an
//! error.  No timeouts, retries or backpressure are applied here.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{ClosedBy, ConnectionState, Endpoint, FeedKind, SessionId, TransportKind};
use crate::ingest::datagram_channel::DatagramChannel;
use crate::ingest::sink::PayloadSink;
use crate::ingest::stream_reassembler::StreamReassembler;
use crate::ingest::transport::{ConnectError, Connector, LinkCloser, TransportLink};
use crate::ingest::UnitReader;

/// Opens sessions for one feed kind through a [`Connector`].
pub struct TransportSession<C> {
    connector: C,
    feed: FeedKind,
}

impl<C: Connector> TransportSession<C> {
    pub fn new(connector: C, feed: FeedKind) -> Self {
        Self { connector, feed }
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    /// Connects to `endpoint` over a transport of `kind`.
    ///
    /// Suspends until the transport is ready.  The returned session is `Open`.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ConnectError`] unchanged; nothing is retried.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        kind: TransportKind,
    ) -> Result<Session, ConnectError> {
        if !endpoint.is_valid() {
            warn!("refusing to connect: invalid host {:?}", endpoint.host);
            return Err(ConnectError::InvalidEndpoint(endpoint.host.clone()));
        }

        let id = SessionId::new();
        let url = endpoint.url(kind);
        let (state, _) = watch::channel(ConnectionState::Connecting);
        info!("session {id}: {kind} connecting to {url}");

        let link = match self.connector.connect(endpoint, kind).await {
            Ok(link) => link,
            Err(e) => {
                warn!("session {id}: {kind} connection failed: {e}");
                return Err(e);
            }
        };
        if link.kind() != kind {
            debug!("session {id}: connector returned a {} link", link.kind());
        }

        state.send_replace(ConnectionState::Open);
        info!("session {id}: {kind} connected ({} feed)", self.feed);

        let shared = Arc::new(SessionShared {
            id,
            kind,
            state,
            closer: link.closer(),
        });

        Ok(Session {
            endpoint: endpoint.clone(),
            feed: self.feed,
            link,
            shared,
        })
    }

    /// Drives the read loop of `session`; see [`run`].
    pub async fn run<S: PayloadSink>(&self, session: Session, sink: S) -> RunSummary {
        run(session, sink).await
    }
}

/// Drives the read loop of `session`, delivering every unit to `sink`,
/// until the transport closes or the session is closed locally.
///
/// Never fails.  The returned summary only describes how the loop ended.
pub async fn run<S: PayloadSink>(session: Session, mut sink: S) -> RunSummary {
    let Session {
        feed, link, shared, ..
    } = session;
    let id = shared.id;
    let mut reader = reader_for(link, feed);
    let mut state = shared.state.subscribe();
    let mut units: u64 = 0;

    let mut closed_by = loop {
        if state.borrow_and_update().is_closed() {
            break ClosedBy::Local;
        }
        tokio::select! {
            biased;
            _ = state.changed() => continue,
            next = reader.next_unit() => match next {
                Some(unit) => {
                    units += 1;
                    sink.deliver(unit);
                }
                None => break ClosedBy::Remote,
            },
        }
    };

    if closed_by == ClosedBy::Remote && !shared.mark_closed() {
        // close() won the race; the transport end was its side effect.
        closed_by = ClosedBy::Local;
    }
    info!("session {id}: closed ({closed_by:?}) after {units} units");

    RunSummary {
        session: id,
        units,
        closed_by,
    }
}

fn reader_for(link: TransportLink, feed: FeedKind) -> Box<dyn UnitReader> {
    match (link, feed) {
        (TransportLink::Multiplexed(link), FeedKind::Counter) => {
            Box::new(DatagramChannel::new(link.datagrams, feed))
        }
        (TransportLink::Multiplexed(link), FeedKind::Video) => {
            Box::new(StreamReassembler::new(link.sub_streams))
        }
        (TransportLink::OrderedByte(link), feed) => {
            Box::new(DatagramChannel::new(link.messages, feed))
        }
    }
}

/// How a read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub session: SessionId,
    /// Units delivered to the sink.
    pub units: u64,
    pub closed_by: ClosedBy,
}

struct SessionShared {
    id: SessionId,
    kind: TransportKind,
    state: watch::Sender<ConnectionState>,
    closer: Arc<dyn LinkCloser>,
}

impl SessionShared {
    /// Moves to `Closed`.  Returns `true` only for the call that transitioned.
    fn mark_closed(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_closed() {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        })
    }
}

/// One connection attempt that reached `Open`.
///
/// Consumed by [`TransportSession::run`]; grab a [`SessionHandle`] first to
/// observe or close it from elsewhere.
pub struct Session {
    endpoint: Endpoint,
    feed: FeedKind,
    link: TransportLink,
    shared: Arc<SessionShared>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn kind(&self) -> TransportKind {
        self.shared.kind
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A cloneable handle that observes and closes a session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Closes the session and its transport.
    ///
    /// Only the call that performs the `Open -> Closed` transition closes the
    /// transport and returns `true`.  Closing an already closed session is a
    /// no-op returning `false`.
    pub fn close(&self) -> bool {
        if !self.shared.mark_closed() {
            return false;
        }
        info!("session {}: closing {} transport", self.shared.id, self.shared.kind);
        self.shared.closer.close();
        true
    }

    /// Resolves once the session is `Closed`.
    pub async fn closed(&self) {
        let mut state = self.shared.state.subscribe();
        // The sender lives in `shared`, which this handle keeps alive.
        let _ = state.wait_for(|s| s.is_closed()).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Unit;
    use crate::ingest::mock::{
        multiplexed_link, ordered_link, CountingCloser, ScriptedConnector, ScriptedMessages,
        ScriptedSubStream, ScriptedSubStreams,
    };

    fn endpoint() -> Endpoint {
        Endpoint::new("localhost")
    }

    #[tokio::test]
    async fn test_connect_yields_open_session() {
        // Arrange
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(ordered_link(
            ScriptedMessages::new([]),
            closer,
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);

        // Act
        let session = transport
            .connect(&endpoint(), TransportKind::OrderedByte)
            .await
            .expect("connect");

        // Assert
        assert_eq!(session.state(), ConnectionState::Open);
        assert_eq!(session.kind(), TransportKind::OrderedByte);
        assert_eq!(session.feed(), FeedKind::Counter);
    }

    #[tokio::test]
    async fn test_connect_propagates_rejection() {
        let rejection = ConnectError::Rejected {
            url: "https://localhost:4433".to_string(),
            reason: "refused".to_string(),
        };
        let connector = ScriptedConnector::new([Err(rejection.clone())]);
        let transport = TransportSession::new(connector, FeedKind::Counter);

        let result = transport
            .connect(&endpoint(), TransportKind::Multiplexed)
            .await;

        assert_eq!(result.err(), Some(rejection));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_host_without_dialing() {
        let connector = Arc::new(ScriptedConnector::new([]));
        let transport = TransportSession::new(Arc::clone(&connector), FeedKind::Counter);

        let result = transport
            .connect(&Endpoint::new(""), TransportKind::Multiplexed)
            .await;

        assert!(matches!(result, Err(ConnectError::InvalidEndpoint(_))));
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn test_connect_rejects_padded_host_without_dialing() {
        // Arrange: a host the URL would carry verbatim, leading space and all
        let connector = Arc::new(ScriptedConnector::new([]));
        let transport = TransportSession::new(Arc::clone(&connector), FeedKind::Counter);

        // Act
        let result = transport
            .connect(&Endpoint::new(" localhost"), TransportKind::OrderedByte)
            .await;

        // Assert
        assert_eq!(
            result.err(),
            Some(ConnectError::InvalidEndpoint(" localhost".to_string()))
        );
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn test_immediate_closure_yields_no_units_and_clean_close() {
        // Arrange: the transport closes before any message arrives
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(multiplexed_link(
            ScriptedMessages::new([]),
            ScriptedSubStreams::new([]),
            Arc::clone(&closer),
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);
        let session = transport
            .connect(&endpoint(), TransportKind::Multiplexed)
            .await
            .expect("connect");
        let handle = session.handle();
        let mut sink: Vec<Unit> = Vec::new();

        // Act
        let summary = run(session, &mut sink).await;

        // Assert
        assert!(sink.is_empty());
        assert_eq!(summary.units, 0);
        assert_eq!(summary.closed_by, ClosedBy::Remote);
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert_eq!(closer.calls(), 0, "remote closure must not re-close the transport");
    }

    #[tokio::test]
    async fn test_multiplexed_counter_reads_datagrams() {
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(multiplexed_link(
            ScriptedMessages::new([vec![0, 0, 0, 0, 0, 0, 0, 42]]),
            ScriptedSubStreams::new([ScriptedSubStream::new([vec![1]])]),
            closer,
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);
        let session = transport
            .connect(&endpoint(), TransportKind::Multiplexed)
            .await
            .expect("connect");
        let mut sink: Vec<Unit> = Vec::new();

        run(session, &mut sink).await;

        assert_eq!(sink, vec![Unit::Counter(42)]);
    }

    #[tokio::test]
    async fn test_multiplexed_video_reads_sub_streams() {
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(multiplexed_link(
            ScriptedMessages::new([vec![0, 0, 0, 0, 0, 0, 0, 42]]),
            ScriptedSubStreams::new([ScriptedSubStream::new([vec![0xF0, 0x0D]])]),
            closer,
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Video);
        let session = transport
            .connect(&endpoint(), TransportKind::Multiplexed)
            .await
            .expect("connect");
        let mut sink: Vec<Unit> = Vec::new();

        run(session, &mut sink).await;

        assert_eq!(sink.len(), 1);
        assert!(matches!(&sink[0], Unit::EncodedFrame(f) if f.bytes == vec![0xF0, 0x0D]));
    }

    #[tokio::test]
    async fn test_local_close_unblocks_pending_read() {
        // Arrange: an open transport that never delivers anything
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(ordered_link(
            ScriptedMessages::new([]).then_hang(),
            Arc::clone(&closer),
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);
        let session = transport
            .connect(&endpoint(), TransportKind::OrderedByte)
            .await
            .expect("connect");
        let handle = session.handle();
        let task = tokio::spawn(run(
            session,
            Vec::<Unit>::new(),
        ));

        // Act
        tokio::task::yield_now().await;
        let first = handle.close();

        // Assert
        let summary = task.await.expect("run task");
        assert!(first);
        assert_eq!(summary.closed_by, ClosedBy::Local);
        assert_eq!(closer.calls(), 1);
    }

    #[tokio::test]
    async fn test_local_close_unblocks_a_stalled_sub_stream_read() {
        // Arrange: one whole frame, then a sub-stream that never yields a chunk
        let closer = CountingCloser::new();
        let stalled = ScriptedSubStream::new([]).then_hang();
        let stalled_reads = stalled.reads();
        let connector = ScriptedConnector::new([Ok(multiplexed_link(
            ScriptedMessages::new([]).then_hang(),
            ScriptedSubStreams::new([ScriptedSubStream::new([vec![0x65, 0x01]]), stalled])
                .then_hang(),
            Arc::clone(&closer),
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Video);
        let session = transport
            .connect(&endpoint(), TransportKind::Multiplexed)
            .await
            .expect("connect");
        let handle = session.handle();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(run(session, tx));

        // Act: wait until the reader sits inside the stalled read, then close
        assert!(matches!(rx.recv().await, Some(Unit::EncodedFrame(_))));
        while stalled_reads.get() == 0 {
            tokio::task::yield_now().await;
        }
        let first = handle.close();

        // Assert
        let summary = task.await.expect("run task");
        assert!(first);
        assert_eq!(summary.units, 1);
        assert_eq!(summary.closed_by, ClosedBy::Local);
        assert_eq!(closer.calls(), 1);
    }

    #[tokio::test]
    async fn test_closing_twice_is_a_noop() {
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(ordered_link(
            ScriptedMessages::new([]).then_hang(),
            Arc::clone(&closer),
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);
        let session = transport
            .connect(&endpoint(), TransportKind::OrderedByte)
            .await
            .expect("connect");
        let handle = session.handle();

        assert!(handle.close());
        assert!(!handle.close());
        assert!(!handle.clone().close());
        assert_eq!(closer.calls(), 1);
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_after_remote_closure_is_a_noop() {
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(ordered_link(
            ScriptedMessages::new([]),
            Arc::clone(&closer),
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);
        let session = transport
            .connect(&endpoint(), TransportKind::OrderedByte)
            .await
            .expect("connect");
        let handle = session.handle();

        run(session, Vec::<Unit>::new()).await;

        assert!(!handle.close());
        assert_eq!(closer.calls(), 0);
    }

    #[tokio::test]
    async fn test_closed_future_resolves_after_close() {
        let closer = CountingCloser::new();
        let connector = ScriptedConnector::new([Ok(ordered_link(
            ScriptedMessages::new([]).then_hang(),
            closer,
        ))]);
        let transport = TransportSession::new(connector, FeedKind::Counter);
        let session = transport
            .connect(&endpoint(), TransportKind::OrderedByte)
            .await
            .expect("connect");
        let handle = session.handle();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.closed().await })
        };

        handle.close();

        waiter.await.expect("closed() must resolve");
    }
}
