//! Application units: the atomic messages the ingest layer hands to a sink.
//!
//! A [`Unit`] only exists once its full payload has arrived.  Counters are
//! always exactly one decoded `u64`; encoded frames carry opaque codec bytes
//! that the ingest layer never inspects.
//!
//! Units carry no sequence number.  Ordering is the arrival order on the
//! channel that produced them.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// What kind of application data a feed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// 64-bit big-endian counters (the telemetry feed).
    Counter,
    /// H.264 encoded frames (the media feed).
    Video,
}

impl FeedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Counter => "counter",
            FeedKind::Video => "video",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counter" | "telemetry" => Ok(FeedKind::Counter),
            "video" | "media" => Ok(FeedKind::Video),
            other => Err(format!("unknown feed kind: {other}")),
        }
    }
}

/// Codec-level classification of an encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Independently decodable frame.
    Key,
    /// Frame that depends on earlier frames.
    Delta,
}

/// An opaque encoded video frame plus its capture timestamp.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Codec bitstream bytes exactly as received.
    pub bytes: Vec<u8>,
    /// Microseconds since the producing reader was created.
    pub timestamp_us: u64,
    /// Frame classification.  The ingest layer always tags frames as key frames.
    pub kind: FrameKind,
}

impl EncodedFrame {
    /// Wraps a received payload as a key frame.
    pub fn key(bytes: Vec<u8>, timestamp_us: u64) -> Self {
        Self {
            bytes,
            timestamp_us,
            kind: FrameKind::Key,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Frames can be hundreds of kilobytes; keep Debug output to the shape.
impl fmt::Debug for EncodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedFrame")
            .field("len", &self.bytes.len())
            .field("timestamp_us", &self.timestamp_us)
            .field("kind", &self.kind)
            .finish()
    }
}

/// One fully received application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Counter(u64),
    EncodedFrame(EncodedFrame),
}

impl Unit {
    /// Short variant name for log lines.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Unit::Counter(_) => "Counter",
            Unit::EncodedFrame(_) => "EncodedFrame",
        }
    }
}

/// Monotonic clock stamping frames relative to when a reader was created.
#[derive(Debug, Clone, Copy)]
pub struct CaptureClock {
    origin: Instant,
}

impl CaptureClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Microseconds elapsed since [`CaptureClock::start`].
    pub fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

impl Default for CaptureClock {
    fn default() -> Self {
        Self::start()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_constructor_tags_frame_as_key() {
        let frame = EncodedFrame::key(vec![0, 0, 0, 1, 0x65], 7);
        assert_eq!(frame.kind, FrameKind::Key);
        assert_eq!(frame.timestamp_us, 7);
        assert_eq!(frame.len(), 5);
    }

    #[test]
    fn test_frame_debug_omits_payload_bytes() {
        let frame = EncodedFrame::key(vec![0xAB; 4096], 0);
        let dbg = format!("{frame:?}");
        assert!(dbg.contains("len: 4096"));
        assert!(!dbg.contains("171"), "payload bytes must not be printed");
    }

    #[test]
    fn test_unit_kind_name() {
        assert_eq!(Unit::Counter(1).kind_name(), "Counter");
        assert_eq!(
            Unit::EncodedFrame(EncodedFrame::key(vec![], 0)).kind_name(),
            "EncodedFrame"
        );
    }

    #[test]
    fn test_feed_kind_parses_aliases() {
        assert_eq!("telemetry".parse(), Ok(FeedKind::Counter));
        assert_eq!("Media".parse(), Ok(FeedKind::Video));
        assert!("audio".parse::<FeedKind>().is_err());
    }

    #[test]
    fn test_capture_clock_is_non_decreasing() {
        let clock = CaptureClock::start();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }
}
