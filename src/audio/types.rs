//! Audio-related small types and handles.
//!
//! This module defines the transport state, the reasons a playback source can
//! be discarded, the event payloads broadcast by the engine and the shared
//! playback snapshot read by callers.

use std::sync::{Arc, Mutex};

use crate::library::Track;

use super::session::PlaybackSession;

/// State of the single playback stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Transport {
    /// Nothing is playing and nothing is held paused.
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Why the active playback source is being discarded.
///
/// Only [`HaltReason::Finished`] reports the end of a track; every other
/// reason discards the source silently.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// Another source takes over (new track, seek).
    Replaced,
    Paused,
    Stopped,
    /// The source ran out of samples on its own.
    Finished,
}

/// Position carried by `play` and `pause`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Position {
    pub current_time: f64,
    pub duration: f64,
}

/// Payload of `timeUpdate`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Progress {
    pub current_time: f64,
    pub duration: f64,
    /// `current_time / duration`, 0 for a zero-length asset.
    pub progress: f64,
}

impl Progress {
    pub fn new(current_time: f64, duration: f64) -> Self {
        let progress = if duration > 0.0 {
            (current_time / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            current_time,
            duration,
            progress,
        }
    }
}

/// Everything the engine broadcasts to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Loading(bool),
    Loaded { duration: f64 },
    Play(Position),
    Pause(Position),
    Stop,
    /// Natural completion of the current track. Never sent for a source that
    /// was paused, replaced or stopped.
    Ended,
    TimeUpdate(Progress),
    VolumeChange(f32),
    Error(String),
    ClearError,
}

/// Discriminant of [`EngineEvent`], used to subscribe by event name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Loading,
    Loaded,
    Play,
    Pause,
    Stop,
    Ended,
    TimeUpdate,
    VolumeChange,
    Error,
    ClearError,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Loading(_) => EventKind::Loading,
            EngineEvent::Loaded { .. } => EventKind::Loaded,
            EngineEvent::Play(_) => EventKind::Play,
            EngineEvent::Pause(_) => EventKind::Pause,
            EngineEvent::Stop => EventKind::Stop,
            EngineEvent::Ended => EventKind::Ended,
            EngineEvent::TimeUpdate(_) => EventKind::TimeUpdate,
            EngineEvent::VolumeChange(_) => EventKind::VolumeChange,
            EngineEvent::Error(_) => EventKind::Error,
            EngineEvent::ClearError => EventKind::ClearError,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Playback snapshot shared with callers outside the engine thread.
pub struct PlaybackInfo {
    /// Track the engine is playing, paused on, or loading.
    pub track: Option<Track>,
    /// Anchor state; combine with the engine clock for the live position.
    pub session: PlaybackSession,
    /// Duration of the resident asset, if any.
    pub duration: Option<f64>,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
