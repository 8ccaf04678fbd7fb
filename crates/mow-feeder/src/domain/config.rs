//! Feeder configuration types.
//!
//! [`FeederConfig`] is the single source of truth for all runtime settings.
//! It is built from CLI arguments in `main.rs`, or from
//! [`FeederConfig::default`] in tests and local development.
//!
//! The domain layer never reads the environment or the filesystem itself; the
//! optional `video_file` is only a path here and is opened by the application
//! layer when the video feed starts.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use mow_core::domain::{FeedKind, RELIABLE_PORT, UNRELIABLE_PORT};

/// Default number of counter values sent per session.
pub const DEFAULT_MAX_VALUE: u64 = 1_000_000;

/// Default pacing between two video access units (roughly 60 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How long a WebTransport session stays open after the last counter datagram.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(3);

/// All runtime configuration for the feeder.
///
/// Build this once at startup and wrap it in an `Arc` so every session task
/// can share it.
///
/// # Example
///
/// ```rust
/// use mow_feeder::domain::FeederConfig;
///
/// let cfg = FeederConfig::default();
/// assert_eq!(cfg.webtransport_addr().port(), 4433);
/// assert_eq!(cfg.websocket_addr().port(), 4434);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeederConfig {
    /// Address both servers bind to.  `::` accepts IPv4 and IPv6 peers on
    /// dual-stack hosts.
    pub bind: IpAddr,

    /// UDP port of the WebTransport server.
    pub webtransport_port: u16,

    /// TCP port of the WebSocket server.
    pub websocket_port: u16,

    /// Which feed every session receives.
    pub feed: FeedKind,

    /// Counter feed: values `0..max_value` are sent.
    pub max_value: u64,

    /// Video feed: pause between two access units.
    pub frame_interval: Duration,

    /// Video feed: Annex-B H.264 file to stream.  `None` selects the
    /// built-in test pattern.
    pub video_file: Option<PathBuf>,

    /// Grace period before a WebTransport counter session is closed, so the
    /// last datagrams are not cut off by the close.
    pub linger: Duration,

    /// Subject alternative names of the self-signed certificate.
    pub certificate_names: Vec<String>,
}

impl FeederConfig {
    pub fn webtransport_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.webtransport_port)
    }

    pub fn websocket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.websocket_port)
    }
}

impl Default for FeederConfig {
    /// | Field              | Default                          |
    /// |--------------------|----------------------------------|
    /// | bind               | `::`                             |
    /// | webtransport_port  | 4433                             |
    /// | websocket_port     | 4434                             |
    /// | feed               | counter                          |
    /// | max_value          | 1 000 000                        |
    /// | frame_interval     | 16 ms                            |
    /// | video_file         | none (built-in test pattern)     |
    /// | linger             | 3 s                              |
    /// | certificate_names  | localhost, 127.0.0.1, ::1        |
    fn default() -> Self {
        Self {
            bind: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            webtransport_port: UNRELIABLE_PORT,
            websocket_port: RELIABLE_PORT,
            feed: FeedKind::Counter,
            max_value: DEFAULT_MAX_VALUE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            video_file: None,
            linger: DEFAULT_LINGER,
            certificate_names: default_certificate_names(),
        }
    }
}

/// The names a local browser or viewer may use to reach the feeder.
pub fn default_certificate_names() -> Vec<String> {
    ["localhost", "127.0.0.1", "::1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports_match_the_viewer_defaults() {
        // Arrange / Act
        let cfg = FeederConfig::default();

        // Assert
        assert_eq!(cfg.webtransport_addr().port(), UNRELIABLE_PORT);
        assert_eq!(cfg.websocket_addr().port(), RELIABLE_PORT);
    }

    #[test]
    fn test_default_bind_is_unspecified_ipv6() {
        let cfg = FeederConfig::default();
        assert!(cfg.bind.is_unspecified());
        assert!(cfg.bind.is_ipv6());
    }

    #[test]
    fn test_default_feed_is_counter_up_to_one_million() {
        let cfg = FeederConfig::default();
        assert_eq!(cfg.feed, FeedKind::Counter);
        assert_eq!(cfg.max_value, 1_000_000);
    }

    #[test]
    fn test_default_pacing() {
        let cfg = FeederConfig::default();
        assert_eq!(cfg.frame_interval, Duration::from_millis(16));
        assert_eq!(cfg.linger, Duration::from_secs(3));
    }

    #[test]
    fn test_default_certificate_covers_local_names() {
        let cfg = FeederConfig::default();
        assert_eq!(cfg.certificate_names, vec!["localhost", "127.0.0.1", "::1"]);
    }

    #[test]
    fn test_custom_bind_changes_both_addresses() {
        let cfg = FeederConfig {
            bind: "127.0.0.1".parse().unwrap(),
            webtransport_port: 9000,
            websocket_port: 9001,
            ..FeederConfig::default()
        };
        assert_eq!(cfg.webtransport_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.websocket_addr().to_string(), "127.0.0.1:9001");
    }
}
