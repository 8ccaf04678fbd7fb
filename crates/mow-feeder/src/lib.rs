//! mow-feeder library crate.
//!
//! The producer side of Media-Over-Web: serves a counter feed or an H.264
//! video feed to viewers over both transports at once.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! [mow-feeder]
//!   ├── domain/           FeederConfig (ports, feed, pacing)
//!   ├── application/      Feed + pump: what is sent and when
//!   └── infrastructure/
//!         ├── identity/   Self-signed certificate for both servers
//!         ├── wt_server/  WebTransport (wtransport), UDP 4433
//!         └── ws_server/  WebSocket over TLS (tokio-tungstenite), TCP 4434
//!         ↕
//! Viewer (mow-viewer or a browser)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `mow-core` only; transports plug in
//!   through the `PayloadOut` trait.
//! - `infrastructure` depends on all other layers plus the network crates.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: feeds and the transport-independent pump.
pub mod application;

/// Infrastructure layer: certificate and the two servers.
pub mod infrastructure;
