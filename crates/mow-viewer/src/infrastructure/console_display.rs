//! A [`Display`] that renders to the log.
//!
//! Pictures resize a virtual [`Surface`]; only size changes are logged, so a
//! steady 60 fps stream stays quiet.  Counters are logged every Nth value.

use tracing::{debug, info};

use crate::application::codec::DecodedPicture;
use crate::application::display::Display;

/// The region a picture is presented in.  Starts empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    /// Resizes to `width` x `height`.  Returns `true` if the size changed.
    pub fn resize_to(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }
}

/// Logs counters and tracks the picture surface.
#[derive(Debug)]
pub struct ConsoleDisplay {
    label: String,
    surface: Surface,
    counter_every: u64,
    last_counter: Option<u64>,
    counters_seen: u64,
    pictures_shown: u64,
}

impl ConsoleDisplay {
    /// `counter_every` of zero is treated as one.
    pub fn new(label: impl Into<String>, counter_every: u64) -> Self {
        Self {
            label: label.into(),
            surface: Surface::default(),
            counter_every: counter_every.max(1),
            last_counter: None,
            counters_seen: 0,
            pictures_shown: 0,
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn last_counter(&self) -> Option<u64> {
        self.last_counter
    }

    pub fn pictures_shown(&self) -> u64 {
        self.pictures_shown
    }
}

impl Display for ConsoleDisplay {
    fn show_counter(&mut self, value: u64) {
        self.last_counter = Some(value);
        self.counters_seen += 1;
        if self.counters_seen % self.counter_every == 0 {
            info!("[{}] {value}", self.label);
        }
    }

    fn show_picture(&mut self, picture: &DecodedPicture) {
        self.pictures_shown += 1;
        if self.surface.resize_to(picture.width, picture.height) {
            info!(
                "[{}] surface resized to {}x{}",
                self.label, picture.width, picture.height
            );
        }
        debug!(
            "[{}] picture at {}us ({})",
            self.label,
            picture.timestamp_us,
            if picture.keyframe { "key" } else { "delta" }
        );
    }
}
