//! The display collaborator: where counters and pictures end up.

use crate::application::codec::DecodedPicture;

/// Presents decoded output.
///
/// Called only from a session's read loop, one call at a time.
pub trait Display: Send {
    /// Shows the latest counter value.
    fn show_counter(&mut self, value: u64);

    /// Shows a decoded picture, resizing the surface to fit it.
    fn show_picture(&mut self, picture: &DecodedPicture);
}
