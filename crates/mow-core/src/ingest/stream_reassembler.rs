//! One unit per incoming unidirectional sub-stream.
//!
//! In stream mode the multiplexed transport opens a fresh sub-stream for
//! every frame.  The reassembler runs this loop:
//!
//! 1. accept the next sub-stream (suspends until one arrives),
//! 2. read exactly one chunk from it,
//! 3. wrap that chunk as a key [`EncodedFrame`],
//! 4. drop the sub-stream without draining it.
//!
//! # Weak contract: first chunk only
//!
//! The first chunk the transport hands back is taken as the entire frame.
//! If a producer's frame spans several reads, only the first part is kept and
//! the rest is discarded with the sub-stream.  There is no length prefix and
//! no multi-chunk reassembly.
//!
//! A sub-stream that finishes before delivering any data yields no unit; the
//! loop moves on to the next sub-stream.  The sequence ends only when the
//! incoming sub-stream queue closes.  A reader that stopped at the first empty
//! sub-stream would lose every frame behind it on a live session, so an empty
//! sub-stream never ends the sequence here.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{CaptureClock, EncodedFrame, Unit};
use crate::ingest::transport::SubStreamSource;
use crate::ingest::UnitReader;

/// Turns a queue of sub-streams into a lazy sequence of encoded frames.
pub struct StreamReassembler<S> {
    source: S,
    clock: CaptureClock,
    skipped_empty: u64,
}

impl<S: SubStreamSource> StreamReassembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            clock: CaptureClock::start(),
            skipped_empty: 0,
        }
    }

    /// Waits for the next sub-stream and returns its first chunk as a frame.
    /// `None` once the incoming sub-stream queue closed.
    pub async fn next_unit(&mut self) -> Option<Unit> {
        loop {
            let mut sub_stream = self.source.accept_sub_stream().await?;
            match sub_stream.read_chunk().await {
                Some(chunk) => {
                    let frame = EncodedFrame::key(chunk, self.clock.now_us());
                    return Some(Unit::EncodedFrame(frame));
                }
                None => {
                    self.skipped_empty += 1;
                    debug!("sub-stream ended before its first chunk; skipped");
                }
            }
        }
    }

    /// Number of sub-streams that finished without any data.
    pub fn skipped_empty(&self) -> u64 {
        self.skipped_empty
    }
}

#[async_trait]
impl<S: SubStreamSource> UnitReader for StreamReassembler<S> {
    async fn next_unit(&mut self) -> Option<Unit> {
        StreamReassembler::next_unit(self).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
