//! Application layer for the viewer.
//!
//! # What lives here?
//!
//! - **`codec`** – the `VideoCodec` collaborator contract and its error type.
//! - **`display`** – the `Display` collaborator contract.
//! - **`render`** – `RenderSink`, the payload sink that routes units through
//!   the codec to the display.
//! - **`supervise`** – optional reconnection around `connect + run`.
//!
//! Nothing here touches a socket; concrete transports, the H.264 probe and
//! the console display live in `infrastructure`.

pub mod codec;
pub mod display;
pub mod render;
pub mod supervise;
