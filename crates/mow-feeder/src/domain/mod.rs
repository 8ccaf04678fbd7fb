//! Domain layer for mow-feeder.
//!
//! Pure configuration types with no I/O.  Sockets, certificates and file
//! reads live in the application and infrastructure layers.

pub mod config;

pub use config::{FeederConfig, DEFAULT_FRAME_INTERVAL, DEFAULT_LINGER, DEFAULT_MAX_VALUE};
