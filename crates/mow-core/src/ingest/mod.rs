//! The reception side: from a connected transport to a stream of [`Unit`]s.
//!
//! - **`transport`** – the capability traits a backend must provide.
//! - **`queue`** – a push-to-pull adapter for callback-style backends.
//! - **`datagram_channel`** – one unit per delimited message.
//! - **`stream_reassembler`** – one unit per incoming sub-stream.
//! - **`session`** – the `Connecting -> Open -> Closed` state machine and the
//!   read loop that feeds a [`PayloadSink`].
//! - **`mock`** – scripted doubles for tests.

pub mod datagram_channel;
pub mod mock;
pub mod queue;
pub mod session;
pub mod sink;
pub mod stream_reassembler;
pub mod transport;

use async_trait::async_trait;

use crate::domain::Unit;

pub use datagram_channel::DatagramChannel;
pub use queue::{push_queue, EventPusher, EventQueue, LinkEvent, DEFAULT_QUEUE_CAPACITY};
pub use session::{run, RunSummary, Session, SessionHandle, TransportSession};
pub use sink::{FnSink, PayloadSink};
pub use stream_reassembler::StreamReassembler;
pub use transport::{
    ConnectError, Connector, LinkCloser, MessageSource, MultiplexedLink, OrderedByteLink,
    SubStream, SubStreamSource, TransportLink,
};

/// A lazy, pull-driven sequence of units.
///
/// `None` is the clean end of the sequence.  Readers never surface errors:
/// a transport failure mid-stream looks exactly like closure.
#[async_trait]
pub trait UnitReader: Send {
    async fn next_unit(&mut self) -> Option<Unit>;
}

#[async_trait]
impl<R: UnitReader + ?Sized> UnitReader for Box<R> {
    async fn next_unit(&mut self) -> Option<Unit> {
        (**self).next_unit().await
    }
}
