/*
 gifplay: animated GIF decoding and frame timing

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as
 published by the Free Software Foundation, either version 3 of the
 License, or (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Decode an animated GIF once, then ask which frame is visible at any point of playback.
//!
//! ```no_run
//! # fn main() -> Result<(), gifplay::Error> {
//! # let bytes = std::fs::read("spinner.gif")?;
//! let gif = gifplay::GifDocument::decode(&bytes)?;
//! match gif.frame_at(1.25, None) {
//!     Some(frame) => println!("showing a {}x{} frame", frame.pixels().width(), frame.pixels().height()),
//!     None => println!("animation finished"),
//! }
//! # Ok(()) }
//! ```
//!
//! For a render loop, [`Player`] keeps the clock and fires a notification when playback ends,
//! and [`Loader`] moves decoding off the render thread.

#[macro_use]
extern crate log;

mod error;
pub use crate::error::*;
pub mod completion;
pub use crate::completion::CompletionHandler;
mod document;
pub use crate::document::{GifDocument, ResourceBundle, ResourceLocator, DEFAULT_LOOP_COUNT, RESOURCE_EXTENSION};
pub mod frame;
pub use crate::frame::{Frame, FrameSet};
mod loader;
pub use crate::loader::{Loaded, Loader, Ticket};
mod player;
pub use crate::player::{PlaybackState, Player};
mod source;
pub use crate::source::{FrameSource, GifSource, DEFAULT_DELAY};

use std::fmt;

/// How many times the whole frame sequence is played
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LoopCount {
    Finite(u32),
    Infinite,
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::Infinite => f.write_str("forever"),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Settings {
    /// Play this many times instead of what the file says
    pub loop_count: Option<LoopCount>,
    /// Playback speed multiplier, 1.0 is normal
    pub speed: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loop_count: None,
            speed: 1.,
        }
    }
}
