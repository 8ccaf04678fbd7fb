//! # mow-core
//!
//! Transport-agnostic reception and framing layer for Media-Over-Web feeds.
//!
//! A viewer connects to a feeder over one of two transports and turns what
//! arrives into discrete units: a counter value or an encoded video frame.
//! This crate owns everything between "bytes arrived" and "unit delivered".
//! It never opens a socket itself; the viewer plugs concrete transports in
//! through the [`ingest::Connector`] trait.
//!
//! # Architecture overview (for beginners)
//!
//! - **`domain`** – Plain data: endpoints, transport and feed kinds, units,
//!   session ids and connection states.
//!
//! - **`protocol`** – Byte-level helpers.  The counter feed sends each value
//!   as 8 big-endian bytes; the video feed sends H.264 in Annex-B form, so
//!   this module also knows how to split that into NAL units and pictures.
//!
//! - **`ingest`** – The async part.  A `TransportSession` connects, picks a
//!   reader for the transport/feed combination and pumps units into a
//!   `PayloadSink` until the connection closes:
//!
//! ```text
//!   Connector ──▶ TransportLink ──▶ DatagramChannel ──┐
//!                                └─▶ StreamReassembler ┴─▶ PayloadSink
//! ```

pub mod domain;
pub mod ingest;
pub mod protocol;

// Re-export the most-used types so callers can write `mow_core::Unit`.
pub use domain::{
    CaptureClock, ClosedBy, ConnectionState, EncodedFrame, Endpoint, FeedKind, FrameKind,
    SessionId, TransportKind, Unit, RELIABLE_PORT, UNRELIABLE_PORT,
};
pub use ingest::{
    run, ConnectError, Connector, PayloadSink, RunSummary, Session, SessionHandle,
    TransportSession, UnitReader,
};
pub use protocol::{decode_big_endian_u64, encode_counter};
