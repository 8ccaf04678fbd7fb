//! Application layer for mow-feeder.
//!
//! Knows *what* a session sends (the counter values or the looped access
//! units, and their pacing) but not *how*: the transports plug in through
//! [`PayloadOut`].
//!
//! # What does NOT belong here?
//!
//! - Binding sockets or accepting sessions (infrastructure)
//! - Certificates and TLS (infrastructure)

pub mod feeds;
pub mod test_pattern;

pub use feeds::{pump, send_failed, AccessUnitSource, Feed, FeedError, PayloadOut};
