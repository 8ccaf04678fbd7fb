//! Push-to-pull adapter for event-driven transports.
//!
//! Some transports announce data through callbacks (`open`, `message`,
//! `close`) rather than through awaitable reads.  The read loop, however, is
//! written against the pull-style [`MessageSource`] contract.  This module
//! bridges the two:
//!
//! ```text
//! transport callbacks ──push──▶ [ bounded mpsc queue ] ──pull──▶ read loop
//!      EventPusher                                         EventQueue
//! ```
//!
//! The queue is bounded; a pusher that awaits [`EventPusher::push`] is held
//! back by a slow consumer.  Nothing else signals flow control.
//!
//! # Lifecycle
//!
//! The sequence of messages the queue yields is finite once closed and cannot
//! be restarted: after a `Closed` event (or after every pusher is dropped)
//! [`EventQueue::next_message`] returns `None` forever.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ingest::transport::MessageSource;

/// Default number of events buffered between transport and read loop.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// An event reported by an event-driven transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The transport became ready.
    Open,
    /// One whole binary message arrived.
    Message(Vec<u8>),
    /// The transport closed.  Nothing after this is delivered.
    Closed,
}

/// Creates a connected pusher/queue pair buffering up to `capacity` events.
///
/// A capacity of zero is treated as one.
pub fn push_queue(capacity: usize) -> (EventPusher, EventQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventPusher { tx },
        EventQueue {
            rx,
            pending: None,
            finished: false,
        },
    )
}

/// The producer half, handed to transport callbacks.
#[derive(Debug, Clone)]
pub struct EventPusher {
    tx: mpsc::Sender<LinkEvent>,
}

impl EventPusher {
    /// Enqueues `event`, waiting for space if the queue is full.
    ///
    /// Returns `false` once the consumer has gone away.
    pub async fn push(&self, event: LinkEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Enqueues `event` without waiting, for callbacks that cannot suspend.
    ///
    /// Returns `false` if the queue is full (the event is dropped) or the
    /// consumer has gone away.
    pub fn try_push(&self, event: LinkEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("event queue full; dropping {}", event_name(&dropped));
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Returns `true` once the consuming [`EventQueue`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The consumer half, read by the session's read loop.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::Receiver<LinkEvent>,
    /// A message that arrived before `Open`, kept for the first read.
    pending: Option<Vec<u8>>,
    finished: bool,
}

impl EventQueue {
    /// Suspends until the transport reports `Open`.
    ///
    /// Returns `false` if the transport closed (or every pusher was dropped)
    /// before opening.  A message arriving before `Open` counts as an
    /// implicit open and is retained for the first [`next_message`] call.
    ///
    /// [`next_message`]: MessageSource::next_message
    pub async fn wait_open(&mut self) -> bool {
        if self.finished {
            return false;
        }
        match self.rx.recv().await {
            Some(LinkEvent::Open) => true,
            Some(LinkEvent::Message(bytes)) => {
                debug!("message arrived before open; treating as opened");
                self.pending = Some(bytes);
                true
            }
            Some(LinkEvent::Closed) | None => {
                self.finish();
                false
            }
        }
    }

    /// Returns `true` once the queue has yielded its final `None`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.rx.close();
    }
}

#[async_trait]
impl MessageSource for EventQueue {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        if let Some(bytes) = self.pending.take() {
            return Some(bytes);
        }
        if self.finished {
            return None;
        }
        loop {
            match self.rx.recv().await {
                Some(LinkEvent::Message(bytes)) => return Some(bytes),
                Some(LinkEvent::Open) => debug!("duplicate open event ignored"),
                Some(LinkEvent::Closed) | None => {
                    self.finish();
                    return None;
                }
            }
        }
    }
}

fn event_name(event: &LinkEvent) -> &'static str {
    match event {
        LinkEvent::Open => "Open",
        LinkEvent::Message(_) => "Message",
        LinkEvent::Closed => "Closed",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
