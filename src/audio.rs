//! Single-stream audio engine.
//!
//! One decoded asset, one active source, one gain stage and an analyser.
//! Elapsed time is derived from clock anchors rather than read back from the
//! output, so pause, resume and seek are exact.

mod analyser;
mod asset;
mod clock;
mod engine;
mod error;
mod events;
mod fetch;
mod player;
mod session;
mod sink;
mod thread;
mod types;

pub use analyser::{FFT_SIZE, FREQUENCY_BIN_COUNT};
pub use asset::DecodedAsset;
pub use clock::{Clock, MonotonicClock};
pub use engine::{EngineCore, LoadStatus, LoadStep, LoadTicket, PlayStep};
pub use error::{EngineError, LoadError, validate_track};
pub use events::{EventBus, Subscription};
pub use fetch::{HttpFetcher, TrackFetcher};
pub use player::AudioEngine;
pub use session::PlaybackSession;
pub use sink::{AudioGraph, RodioGraph};
pub use types::{
    EngineEvent, EventKind, HaltReason, PlaybackHandle, PlaybackInfo, Position, Progress,
    Transport,
};

#[cfg(test)]
mod tests;
