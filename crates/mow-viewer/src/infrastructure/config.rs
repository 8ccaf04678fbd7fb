//! TOML-based configuration for the viewer.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working viewer for a feeder on `localhost`.  Example:
//!
//! ```toml
//! host = "feeder.lan"
//! transport = "websocket"
//! feeds = ["counter", "video"]
//! accept_invalid_certs = true
//! reconnect_interval_secs = 5
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent from the file.  CLI flags are applied on top of
//! the loaded file by `main.rs`.

use std::path::{Path, PathBuf};

use mow_core::{Endpoint, FeedKind, TransportKind, RELIABLE_PORT, UNRELIABLE_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::codec::AVC_CODEC;
use crate::application::supervise::ReconnectPolicy;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but makes no sense.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Viewer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Feeder host name or IP literal.
    #[serde(default = "default_host")]
    pub host: String,
    /// WebTransport (UDP) port.
    #[serde(default = "default_unreliable_port")]
    pub unreliable_port: u16,
    /// WebSocket (TCP) port.
    #[serde(default = "default_reliable_port")]
    pub reliable_port: u16,
    /// Which transport every feed uses.
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    /// Feeds to open, one session each.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedKind>,
    /// RFC 6381 codec identifier handed to the video codec.
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Buffered events between a push-style transport and its read loop.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Skip server certificate verification (self-signed feeders).
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Reconnect interval; absent means run each session once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_interval_secs: Option<u64>,
    /// Log every Nth counter value.
    #[serde(default = "default_counter_log_every")]
    pub counter_log_every: u64,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "localhost".to_string()
}
fn default_unreliable_port() -> u16 {
    UNRELIABLE_PORT
}
fn default_reliable_port() -> u16 {
    RELIABLE_PORT
}
fn default_transport() -> TransportKind {
    TransportKind::Multiplexed
}
fn default_feeds() -> Vec<FeedKind> {
    vec![FeedKind::Counter]
}
fn default_codec() -> String {
    AVC_CODEC.to_string()
}
fn default_queue_capacity() -> usize {
    mow_core::ingest::DEFAULT_QUEUE_CAPACITY
}
fn default_counter_log_every() -> u64 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            unreliable_port: default_unreliable_port(),
            reliable_port: default_reliable_port(),
            transport: default_transport(),
            feeds: default_feeds(),
            codec: default_codec(),
            queue_capacity: default_queue_capacity(),
            accept_invalid_certs: false,
            reconnect_interval_secs: None,
            counter_log_every: default_counter_log_every(),
            log_level: default_log_level(),
        }
    }
}

impl ViewerConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or returns the defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml`](Self::from_toml).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint().is_valid() {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: format!("{:?} is not a host name or IP literal", self.host),
            });
        }
        if self.feeds.is_empty() {
            return Err(ConfigError::Invalid {
                field: "feeds",
                reason: "at least one feed is required".to_string(),
            });
        }
        if self.counter_log_every == 0 {
            return Err(ConfigError::Invalid {
                field: "counter_log_every",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone()).with_ports(self.unreliable_port, self.reliable_port)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::from_interval_secs(self.reconnect_interval_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_targets_local_feeder_ports() {
        // Arrange / Act
        let cfg = ViewerConfig::default();

        // Assert
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.unreliable_port, 4433);
        assert_eq!(cfg.reliable_port, 4434);
        assert_eq!(cfg.transport, TransportKind::Multiplexed);
        assert_eq!(cfg.feeds, vec![FeedKind::Counter]);
        assert_eq!(cfg.codec, "avc1.42E01E");
        assert!(!cfg.accept_invalid_certs);
        assert_eq!(cfg.reconnect_policy(), ReconnectPolicy::Never);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = ViewerConfig::from_toml("").expect("parse empty");
        assert_eq!(cfg, ViewerConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        // Arrange
        let text = r#"
host = "feeder.lan"
transport = "websocket"
feeds = ["counter", "video"]
reconnect_interval_secs = 5
"#;

        // Act
        let cfg = ViewerConfig::from_toml(text).expect("parse");

        // Assert
        assert_eq!(cfg.host, "feeder.lan");
        assert_eq!(cfg.transport, TransportKind::OrderedByte);
        assert_eq!(cfg.feeds, vec![FeedKind::Counter, FeedKind::Video]);
        assert_eq!(cfg.reconnect_policy(), ReconnectPolicy::Every(Duration::from_secs(5)));
        assert_eq!(cfg.reliable_port, 4434);
    }

    #[test]
    fn test_endpoint_carries_configured_ports() {
        let cfg = ViewerConfig {
            unreliable_port: 9443,
            reliable_port: 9444,
            ..ViewerConfig::default()
        };

        let endpoint = cfg.endpoint();

        assert_eq!(endpoint.url(TransportKind::Multiplexed), "https://localhost:9443");
        assert_eq!(endpoint.url(TransportKind::OrderedByte), "wss://localhost:9444");
    }

    #[test]
    fn test_empty_feed_list_is_rejected() {
        let result = ViewerConfig::from_toml("feeds = []");
        assert!(matches!(result, Err(ConfigError::Invalid { field: "feeds", .. })));
    }

    #[test]
    fn test_bad_host_is_rejected() {
        let result = ViewerConfig::from_toml(r#"host = "not a host""#);
        assert!(matches!(result, Err(ConfigError::Invalid { field: "host", .. })));
    }

    #[test]
    fn test_unknown_transport_is_a_parse_error() {
        let result = ViewerConfig::from_toml(r#"transport = "carrier-pigeon""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = ViewerConfig::load(Some(Path::new("/nonexistent/mow-viewer.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_no_file_gives_defaults() {
        let cfg = ViewerConfig::load(None).expect("defaults");
        assert_eq!(cfg, ViewerConfig::default());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let cfg = ViewerConfig {
            feeds: vec![FeedKind::Video],
            reconnect_interval_secs: Some(2),
            ..ViewerConfig::default()
        };

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored = ViewerConfig::from_toml(&text).expect("deserialize");

        assert_eq!(cfg, restored);
    }
}
