//! RenderSink: the payload sink that drives the codec and the display.
//!
//! ```text
//! Unit::Counter(v)       ──────────────────────▶ Display::show_counter
//! Unit::EncodedFrame(f)  ──▶ VideoCodec::decode ─▶ Display::show_picture
//!                                   │
//!                                   └─ Err ──▶ warn! and continue
//! ```

use mow_core::{PayloadSink, Unit};
use tracing::{debug, warn};

use crate::application::codec::{CodecError, VideoCodec};
use crate::application::display::Display;

/// A [`PayloadSink`] that renders units through a codec and a display.
pub struct RenderSink<C, D> {
    codec: C,
    display: D,
    decode_errors: u64,
}

impl<C: VideoCodec, D: Display> RenderSink<C, D> {
    /// Configures `codec` with `codec_id` and wraps it with `display`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedCodec`] if the codec rejects the id.
    pub fn new(mut codec: C, codec_id: &str, display: D) -> Result<Self, CodecError> {
        codec.configure(codec_id)?;
        Ok(Self {
            codec,
            display,
            decode_errors: 0,
        })
    }

    /// Number of frames the codec rejected so far.
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

impl<C: VideoCodec, D: Display> PayloadSink for RenderSink<C, D> {
    fn deliver(&mut self, unit: Unit) {
        match unit {
            Unit::Counter(value) => self.display.show_counter(value),
            Unit::EncodedFrame(frame) => match self.codec.decode(&frame) {
                Ok(Some(picture)) => self.display.show_picture(&picture),
                Ok(None) => debug!("frame of {} bytes produced no picture", frame.len()),
                Err(e) => {
                    self.decode_errors += 1;
                    warn!("decode failed: {e}");
                }
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
