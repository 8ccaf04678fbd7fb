//! Infrastructure layer for the viewer.
//!
//! Contains the adapters that touch the outside world: sockets, TLS, the
//! config file and the log-backed display.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `mow_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`config`** – `ViewerConfig` and its TOML loader.
//! - **`connector`** – `NetworkConnector`, the `Connector` used in production.
//! - **`webtransport`** – datagram and uni-stream adapters over `wtransport`.
//! - **`websocket`** – binary-message adapter over `tokio-tungstenite`.
//! - **`tls`** – the "accept any certificate" policy for self-signed feeders.
//! - **`h264_probe`** – `H264Probe`, a `VideoCodec` that reads stream
//!   dimensions from the sequence parameter set.
//! - **`console_display`** – `ConsoleDisplay`, a `Display` that logs.

pub mod config;
pub mod connector;
pub mod console_display;
pub mod h264_probe;
pub mod tls;
pub mod websocket;
pub mod webtransport;
