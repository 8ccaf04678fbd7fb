//! Scripted transport doubles for tests.
//!
//! The real transports need a network, TLS certificates and a peer.  These
//! doubles replay a fixed script instead, so the ingest layer can be tested
//! deterministically:
//!
//! - [`ScriptedMessages`] – a [`MessageSource`] yielding a fixed list.
//! - [`ScriptedSubStream`] / [`ScriptedSubStreams`] – sub-streams with
//!   pre-recorded chunks and a shared read counter.
//! - [`CountingCloser`] – a [`LinkCloser`] that counts calls.
//! - [`ScriptedConnector`] – a [`Connector`] returning queued outcomes.
//!
//! Sources built with `then_hang()` suspend forever once the script is
//! exhausted, which models an open transport with no traffic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{Endpoint, TransportKind};
use crate::ingest::transport::{
    ConnectError, Connector, LinkCloser, MessageSource, MultiplexedLink, OrderedByteLink,
    SubStream, SubStreamSource, TransportLink,
};

/// A [`MessageSource`] replaying a fixed list of messages.
#[derive(Debug, Default)]
pub struct ScriptedMessages {
    messages: VecDeque<Vec<u8>>,
    hang_when_empty: bool,
}

impl ScriptedMessages {
    pub fn new(messages: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
            hang_when_empty: false,
        }
    }

    /// Suspend forever instead of reporting closure once the script runs out.
    pub fn then_hang(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }
}

#[async_trait]
impl MessageSource for ScriptedMessages {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        match self.messages.pop_front() {
            Some(message) => Some(message),
            None if self.hang_when_empty => std::future::pending().await,
            None => None,
        }
    }
}

/// Counts `read_chunk` calls across clones.
#[derive(Debug, Clone, Default)]
pub struct ReadCounter(Arc<AtomicUsize>);

impl ReadCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A sub-stream replaying pre-recorded chunks.
#[derive(Debug, Default)]
pub struct ScriptedSubStream {
    chunks: VecDeque<Vec<u8>>,
    reads: ReadCounter,
    hang_when_empty: bool,
}

impl ScriptedSubStream {
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            reads: ReadCounter::default(),
            hang_when_empty: false,
        }
    }

    /// After its chunks run out, `read_chunk` suspends forever instead of
    /// reporting the end of the sub-stream.
    pub fn then_hang(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }

    /// A sub-stream that finishes without ever delivering data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a handle observing how many times this sub-stream was read.
    pub fn reads(&self) -> ReadCounter {
        self.reads.clone()
    }
}

#[async_trait]
impl SubStream for ScriptedSubStream {
    async fn read_chunk(&mut self) -> Option<Vec<u8>> {
        self.reads.bump();
        match self.chunks.pop_front() {
            Some(chunk) => Some(chunk),
            None if self.hang_when_empty => std::future::pending().await,
            None => None,
        }
    }
}

/// A queue of incoming sub-streams replaying a fixed list.
#[derive(Debug, Default)]
pub struct ScriptedSubStreams {
    streams: VecDeque<ScriptedSubStream>,
    hang_when_empty: bool,
}

impl ScriptedSubStreams {
    pub fn new(streams: impl IntoIterator<Item = ScriptedSubStream>) -> Self {
        Self {
            streams: streams.into_iter().collect(),
            hang_when_empty: false,
        }
    }

    pub fn then_hang(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }
}

#[async_trait]
impl SubStreamSource for ScriptedSubStreams {
    async fn accept_sub_stream(&mut self) -> Option<Box<dyn SubStream>> {
        match self.streams.pop_front() {
            Some(stream) => Some(Box::new(stream)),
            None if self.hang_when_empty => std::future::pending().await,
            None => None,
        }
    }
}

/// A [`LinkCloser`] recording how many times it was invoked.
#[derive(Debug, Default)]
pub struct CountingCloser {
    calls: AtomicUsize,
}

impl CountingCloser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LinkCloser for CountingCloser {
    fn close(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds a multiplexed link from scripted parts.
pub fn multiplexed_link(
    datagrams: impl MessageSource + 'static,
    sub_streams: impl SubStreamSource + 'static,
    closer: Arc<CountingCloser>,
) -> TransportLink {
    TransportLink::Multiplexed(MultiplexedLink {
        datagrams: Box::new(datagrams),
        sub_streams: Box::new(sub_streams),
        closer,
    })
}

/// Builds an ordered-byte link from a scripted message source.
pub fn ordered_link(
    messages: impl MessageSource + 'static,
    closer: Arc<CountingCloser>,
) -> TransportLink {
    TransportLink::OrderedByte(OrderedByteLink {
        messages: Box::new(messages),
        closer,
    })
}

/// A [`Connector`] handing out queued outcomes, one per `connect` call.
#[derive(Default)]
pub struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Result<TransportLink, ConnectError>>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(outcomes: impl IntoIterator<Item = Result<TransportLink, ConnectError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `connect` calls made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        kind: TransportKind,
    ) -> Result<TransportLink, ConnectError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = match self.outcomes.lock() {
            Ok(mut outcomes) => outcomes.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| {
            Err(ConnectError::Rejected {
                url: endpoint.url(kind),
                reason: "no scripted outcome left".to_string(),
            })
        })
    }
}
