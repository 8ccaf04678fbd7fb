//! Domain types shared by every layer.
//!
//! Nothing in here performs I/O.  The types describe *what* flows through the
//! system (endpoints, units, session states); the `ingest` module describes
//! *how* it flows.

pub mod endpoint;
pub mod session;
pub mod unit;

pub use endpoint::{Endpoint, TransportKind, RELIABLE_PORT, UNRELIABLE_PORT};
pub use session::{ClosedBy, ConnectionState, SessionId};
pub use unit::{CaptureClock, EncodedFrame, FeedKind, FrameKind, Unit};
