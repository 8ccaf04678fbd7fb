//! Infrastructure layer for mow-feeder.
//!
//! Everything that touches the network or TLS:
//!
//! - [`identity`]: the self-signed certificate shared by both servers.
//! - [`wt_server`]: WebTransport accept loop (datagrams and uni streams).
//! - [`ws_server`]: TLS WebSocket accept loop (binary messages).

pub mod identity;
pub mod ws_server;
pub mod wt_server;

pub use identity::{IdentityError, ServerIdentity};
pub use ws_server::{bind_websocket, serve_websocket};
pub use wt_server::{bind_webtransport, serve_webtransport};
