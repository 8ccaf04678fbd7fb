//! Session identity and lifecycle states.
//!
//! ```text
//! Connecting ──ready──▶ Open ──close──▶ Closed
//! ```
//!
//! There is deliberately no error state: connection failures never produce a
//! session, and decode failures never end one.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one connection attempt.  Sessions are never reused across
/// reconnects, so each attempt gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    /// Prints the first 8 hex digits, which is plenty to tell sessions apart in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Waiting for the transport to signal readiness.
    Connecting,
    /// The read loop may produce units.
    Open,
    /// Terminal.  No further units are produced.
    Closed,
}

impl ConnectionState {
    pub fn is_closed(self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

/// Which side ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClosedBy {
    /// `close()` was called on this side.
    Local,
    /// The transport signalled end-of-stream.
    Remote,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_session_id_display_is_short() {
        let id = SessionId::new();
        assert_eq!(id.to_string().len(), 8);
    }

    #[test]
    fn test_only_closed_is_closed() {
        assert!(!ConnectionState::Connecting.is_closed());
        assert!(!ConnectionState::Open.is_closed());
        assert!(ConnectionState::Closed.is_closed());
    }
}
