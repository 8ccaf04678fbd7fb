//! The video codec collaborator.
//!
//! The ingest layer never looks inside an encoded frame.  It hands each
//! [`EncodedFrame`] to a [`VideoCodec`], which is configured once with a codec
//! identifier (an RFC 6381 string such as `avc1.42E01E`) and then fed frames
//! in arrival order.
//!
//! Codec errors never end a session: the render sink logs them and moves on
//! to the next frame.

use mow_core::EncodedFrame;
use thiserror::Error;

/// H.264 Constrained Baseline, level 3.0.  What the feeder's encoder emits.
pub const AVC_CODEC: &str = "avc1.42E01E";

/// Errors reported by a [`VideoCodec`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// `decode` was called before a successful `configure`.
    #[error("codec is not configured")]
    NotConfigured,

    /// The codec identifier is not one this codec can handle.
    #[error("unsupported codec identifier: {0:?}")]
    UnsupportedCodec(String),

    /// The frame could not be parsed.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The frame uses a feature this codec does not implement.
    #[error("unsupported stream feature: {0}")]
    Unsupported(String),
}

/// What a codec reports for one displayable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPicture {
    pub width: u32,
    pub height: u32,
    /// Copied from the encoded frame.
    pub timestamp_us: u64,
    /// `true` if the frame carried an IDR slice.
    pub keyframe: bool,
}

/// Decodes encoded frames into pictures.
///
/// `decode` returns `Ok(None)` when a frame is accepted but produces nothing
/// to show yet (for example, parameter sets only).
pub trait VideoCodec: Send {
    /// Selects the codec.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedCodec`] if `codec` is not recognised.
    fn configure(&mut self, codec: &str) -> Result<(), CodecError>;

    /// Decodes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the codec is not configured or the frame is
    /// unusable.  The caller is expected to log and continue.
    fn decode(&mut self, frame: &EncodedFrame) -> Result<Option<DecodedPicture>, CodecError>;
}

impl<C: VideoCodec + ?Sized> VideoCodec for Box<C> {
    fn configure(&mut self, codec: &str) -> Result<(), CodecError> {
        (**self).configure(codec)
    }

    fn decode(&mut self, frame: &EncodedFrame) -> Result<Option<DecodedPicture>, CodecError> {
        (**self).decode(frame)
    }
}
