//! Connection targets and transport selection.
//!
//! An [`Endpoint`] names the remote host together with the two fixed ports the
//! feed is published on.  It is built once from user input before `connect`
//! is called and never changes for the lifetime of a session.
//!
//! # Two ports, two transports
//!
//! ```text
//! https://<host>:4433   Multiplexed transport (WebTransport over QUIC)
//! wss://<host>:4434     Ordered-byte transport (WebSocket over TLS)
//! ```
//!
//! The port numbers are constants of the deployment, not negotiated values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Port the multiplexed (unreliable datagram + sub-stream) transport listens on.
pub const UNRELIABLE_PORT: u16 = 4433;

/// Port the ordered-byte (WebSocket) transport listens on.
pub const RELIABLE_PORT: u16 = 4434;

/// Which of the two interchangeable transport backends a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Datagrams plus incoming unidirectional sub-streams over one connection.
    #[serde(alias = "webtransport")]
    Multiplexed,
    /// A single reliable, ordered channel of whole binary messages.
    #[serde(alias = "websocket")]
    OrderedByte,
}

impl TransportKind {
    /// Returns the short name used in log lines and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Multiplexed => "webtransport",
            TransportKind::OrderedByte => "websocket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webtransport" | "multiplexed" | "wt" => Ok(TransportKind::Multiplexed),
            "websocket" | "orderedbyte" | "ordered-byte" | "ws" => Ok(TransportKind::OrderedByte),
            other => Err(format!("unknown transport kind: {other}")),
        }
    }
}

/// The remote side of a session: host plus the two well-known ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname, IPv4 literal, or IPv6 literal (without brackets).
    pub host: String,
    /// Port of the multiplexed transport.
    pub unreliable_port: u16,
    /// Port of the ordered-byte transport.
    pub reliable_port: u16,
}

impl Endpoint {
    /// Creates an endpoint for `host` on the default ports.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            unreliable_port: UNRELIABLE_PORT,
            reliable_port: RELIABLE_PORT,
        }
    }

    /// Overrides both ports.
    pub fn with_ports(mut self, unreliable_port: u16, reliable_port: u16) -> Self {
        self.unreliable_port = unreliable_port;
        self.reliable_port = reliable_port;
        self
    }

    /// Returns the URL a transport of `kind` connects to.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mow_core::{Endpoint, TransportKind};
    ///
    /// let ep = Endpoint::new("example.org");
    /// assert_eq!(ep.url(TransportKind::Multiplexed), "https://example.org:4433");
    /// assert_eq!(ep.url(TransportKind::OrderedByte), "wss://example.org:4434");
    /// ```
    pub fn url(&self, kind: TransportKind) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match kind {
            TransportKind::Multiplexed => format!("https://{host}:{}", self.unreliable_port),
            TransportKind::OrderedByte => format!("wss://{host}:{}", self.reliable_port),
        }
    }

    /// Returns `true` if the host string is usable for a connection attempt.
    ///
    /// Judged on the exact string [`url`](Self::url) would embed, so any
    /// whitespace, leading or trailing included, makes the host invalid.
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty()
            && !self.host.contains(char::is_whitespace)
            && !self.host.contains('/')
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("localhost")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
