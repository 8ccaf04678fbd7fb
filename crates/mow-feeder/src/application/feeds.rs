//! What a feeder session sends, independent of how it is sent.
//!
//! # Overview (for beginners)
//!
//! Both servers (WebTransport and WebSocket) serve the same two feeds:
//!
//! - **Counter**: the numbers `0..max_value`, each encoded as 8 big-endian
//!   bytes.  One payload per number, sent as fast as the transport accepts
//!   them, yielding to the scheduler between sends.
//! - **Video**: the access units of an Annex-B H.264 file, or of the built-in
//!   [`test_pattern`](crate::application::test_pattern) clip when no file is
//!   given, one payload per access unit, paced by `frame_interval` and looped
//!   forever.
//!
//! The transport-specific part is a single trait, [`PayloadOut`]: "send this
//! one payload as one message".  [`pump`] drives a [`Feed`] into any
//! `PayloadOut` until the feed is exhausted, the peer goes away, or the
//! server's `running` flag is cleared.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use mow_core::domain::FeedKind;
use mow_core::encode_counter;
use mow_core::protocol::annexb::group_access_units;

use crate::application::test_pattern;
use crate::domain::FeederConfig;

/// Errors raised while preparing or sending a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The video file could not be read.
    #[error("failed to read video file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The video file contains no complete coded picture.
    #[error("no access units found in {path}")]
    NoAccessUnits { path: PathBuf },

    /// The transport refused a payload, usually because the peer left.
    #[error("send failed: {0}")]
    Send(String),
}

/// Wraps any transport error as [`FeedError::Send`].
pub fn send_failed(e: impl std::fmt::Display) -> FeedError {
    FeedError::Send(e.to_string())
}

/// The access units of one H.264 file, shared by every session.
///
/// Cloning is cheap: all clones point at the same immutable list.
#[derive(Debug, Clone)]
pub struct AccessUnitSource {
    units: Arc<[Vec<u8>]>,
}

impl AccessUnitSource {
    /// Groups an in-memory Annex-B stream.  `None` when it holds no picture.
    pub fn from_annexb(bytes: &[u8]) -> Option<Self> {
        let units = group_access_units(bytes);
        if units.is_empty() {
            return None;
        }
        Some(Self {
            units: units.into(),
        })
    }

    /// Reads and groups an Annex-B file.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let bytes = std::fs::read(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_annexb(&bytes).ok_or_else(|| FeedError::NoAccessUnits {
            path: path.to_path_buf(),
        })?;
        info!(
            "loaded {} access units ({} bytes) from {}",
            source.len(),
            bytes.len(),
            path.display()
        );
        Ok(source)
    }

    /// The built-in test pattern clip.
    pub fn test_pattern() -> Self {
        Self {
            units: test_pattern::access_units().into(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Access units in file order, repeated forever.
    pub fn looped(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.units.iter().map(Vec::as_slice).cycle()
    }
}

/// One feed, ready to be pumped into any number of sessions.
#[derive(Debug, Clone)]
pub enum Feed {
    Counter { max_value: u64 },
    Video { units: AccessUnitSource, interval: Duration },
}

impl Feed {
    /// Builds the configured feed.  The video feed loads `video_file` when
    /// one is set and falls back to the built-in test pattern otherwise.
    pub fn from_config(config: &FeederConfig) -> Result<Self, FeedError> {
        match config.feed {
            FeedKind::Counter => Ok(Feed::Counter {
                max_value: config.max_value,
            }),
            FeedKind::Video => {
                let units = match config.video_file.as_deref() {
                    Some(path) => AccessUnitSource::load(path)?,
                    None => {
                        info!("no video file given, serving the built-in test pattern");
                        AccessUnitSource::test_pattern()
                    }
                };
                Ok(Feed::Video {
                    units,
                    interval: config.frame_interval,
                })
            }
        }
    }

    pub fn kind(&self) -> FeedKind {
        match self {
            Feed::Counter { .. } => FeedKind::Counter,
            Feed::Video { .. } => FeedKind::Video,
        }
    }
}

/// Sends one payload as one transport message (datagram, sub-stream or
/// WebSocket binary message).
#[async_trait]
pub trait PayloadOut: Send {
    async fn send(&mut self, payload: &[u8]) -> Result<(), FeedError>;
}

/// Drives `feed` into `out`.
///
/// Returns the number of payloads sent.  Stops early, without error, once
/// `running` is cleared.  A failed send ends the pump with that error.
pub async fn pump<O>(feed: &Feed, out: &mut O, running: &AtomicBool) -> Result<u64, FeedError>
where
    O: PayloadOut + ?Sized,
{
    let mut sent = 0u64;
    match feed {
        Feed::Counter { max_value } => {
            for value in 0..*max_value {
                if !running.load(Ordering::Relaxed) {
                    debug!("shutdown during counter feed after {sent} values");
                    break;
                }
                out.send(&encode_counter(value)).await?;
                sent += 1;
                tokio::task::yield_now().await;
            }
        }
        Feed::Video { units, interval } => {
            for unit in units.looped() {
                if !running.load(Ordering::Relaxed) {
                    debug!("shutdown during video feed after {sent} access units");
                    break;
                }
                out.send(unit).await?;
                sent += 1;
                tokio::time::sleep(*interval).await;
            }
        }
    }
    Ok(sent)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
