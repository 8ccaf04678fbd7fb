//! One unit per already-delimited message.
//!
//! Datagrams and WebSocket binary messages arrive with their boundaries
//! intact, so no buffering across messages is needed: every message body is
//! exactly one payload.
//!
//! - Counter feed: the body is decoded with
//!   [`decode_big_endian_u64`](crate::protocol::decode_big_endian_u64).
//! - Video feed: the body is wrapped as a key [`EncodedFrame`] stamped with
//!   the channel's capture clock.
//!
//! Units come out in exactly the order the messages arrived.  When the source
//! closes the sequence simply ends.

use async_trait::async_trait;

use crate::domain::{CaptureClock, EncodedFrame, FeedKind, Unit};
use crate::ingest::transport::MessageSource;
use crate::ingest::UnitReader;
use crate::protocol::decode_big_endian_u64;

/// Turns a [`MessageSource`] into a lazy sequence of [`Unit`]s.
pub struct DatagramChannel<S> {
    source: S,
    feed: FeedKind,
    clock: CaptureClock,
}

impl<S: MessageSource> DatagramChannel<S> {
    pub fn new(source: S, feed: FeedKind) -> Self {
        Self {
            source,
            feed,
            clock: CaptureClock::start(),
        }
    }

    /// Waits for the next message and converts it.  `None` once the source closed.
    pub async fn next_unit(&mut self) -> Option<Unit> {
        let message = self.source.next_message().await?;
        Some(match self.feed {
            FeedKind::Counter => Unit::Counter(decode_big_endian_u64(&message)),
            FeedKind::Video => Unit::EncodedFrame(EncodedFrame::key(message, self.clock.now_us())),
        })
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }
}

#[async_trait]
impl<S: MessageSource> UnitReader for DatagramChannel<S> {
    async fn next_unit(&mut self) -> Option<Unit> {
        DatagramChannel::next_unit(self).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FrameKind;
    use crate::ingest::mock::ScriptedMessages;

    async fn drain<S: MessageSource>(channel: &mut DatagramChannel<S>) -> Vec<Unit> {
        let mut units = Vec::new();
        while let Some(unit) = channel.next_unit().await {
            units.push(unit);
        }
        units
    }

    #[tokio::test]
    async fn test_counter_messages_become_counters_in_order() {
        // Arrange
        let source = ScriptedMessages::new([
            3u64.to_be_bytes().to_vec(),
            1u64.to_be_bytes().to_vec(),
            2u64.to_be_bytes().to_vec(),
        ]);
        let mut channel = DatagramChannel::new(source, FeedKind::Counter);

        // Act
        let units = drain(&mut channel).await;

        // Assert
        assert_eq!(
            units,
            vec![Unit::Counter(3), Unit::Counter(1), Unit::Counter(2)]
        );
    }

    #[tokio::test]
    async fn test_n_messages_of_any_size_give_n_units() {
        // Arrange: sizes from empty to large
        let sizes = [0usize, 1, 7, 8, 9, 1500, 65_536];
        let source = ScriptedMessages::new(sizes.iter().map(|&n| vec![0xAA; n]));
        let mut channel = DatagramChannel::new(source, FeedKind::Video);

        // Act
        let units = drain(&mut channel).await;

        // Assert
        assert_eq!(units.len(), sizes.len());
        for (unit, &size) in units.iter().zip(sizes.iter()) {
            match unit {
                Unit::EncodedFrame(frame) => assert_eq!(frame.len(), size),
                other => panic!("unexpected unit {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_video_messages_are_key_frames_with_whole_body() {
        let body = vec![0, 0, 0, 1, 0x65, 0x88, 0x84];
        let source = ScriptedMessages::new([body.clone()]);
        let mut channel = DatagramChannel::new(source, FeedKind::Video);

        let unit = channel.next_unit().await;

        match unit {
            Some(Unit::EncodedFrame(frame)) => {
                assert_eq!(frame.bytes, body);
                assert_eq!(frame.kind, FrameKind::Key);
            }
            other => panic!("expected an encoded frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_frame_timestamps_do_not_go_backwards() {
        let source = ScriptedMessages::new((0..5).map(|i| vec![i]));
        let mut channel = DatagramChannel::new(source, FeedKind::Video);

        let stamps: Vec<u64> = drain(&mut channel)
            .await
            .into_iter()
            .filter_map(|u| match u {
                Unit::EncodedFrame(f) => Some(f.timestamp_us),
                _ => None,
            })
            .collect();

        assert_eq!(stamps.len(), 5);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_short_counter_message_uses_weak_decode() {
        let source = ScriptedMessages::new([vec![1, 0]]);
        let mut channel = DatagramChannel::new(source, FeedKind::Counter);
        assert_eq!(channel.next_unit().await, Some(Unit::Counter(256)));
    }

    #[tokio::test]
    async fn test_closed_source_ends_cleanly_and_stays_ended() {
        let mut channel = DatagramChannel::new(ScriptedMessages::new([]), FeedKind::Counter);
        assert_eq!(channel.next_unit().await, None);
        assert_eq!(channel.next_unit().await, None);
    }
}
