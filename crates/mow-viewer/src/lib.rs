//! mow-viewer library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does mow-viewer do? (for beginners)
//!
//! The *viewer* is the receiving end of a Media-Over-Web feed.  A *feeder*
//! publishes either a stream of 64-bit counter values or an H.264 video
//! stream, and the viewer:
//!
//! 1. Connects to the feeder over WebTransport (port 4433) or WebSocket
//!    (port 4434), one session per feed.
//! 2. Lets `mow-core` turn datagrams, uni-streams or WebSocket messages into
//!    counters and encoded frames.
//! 3. Routes counters to the display and frames through a codec first
//!    (`RenderSink`).
//! 4. Optionally reconnects when a feeder goes away.

/// Application layer: collaborator contracts, render sink, supervision.
pub mod application;

/// Infrastructure layer: transports, TLS, config, probe and display.
pub mod infrastructure;
