//! Playlist sequencing on top of the audio engine.
//!
//! [`PlaybackCoordinator`] decides what plays and in what order: playlist,
//! queue, history, shuffle and repeat. It reaches audio only through the
//! [`Player`] trait.

mod ended;
mod playback;
mod player;
mod sequence;

pub use ended::EndedSignal;
pub use playback::{CoordinatorState, PlaybackCoordinator};
pub use player::Player;
pub use sequence::{PlaybackModes, Sequence, Step};
