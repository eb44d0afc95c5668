//! encore: the playback core of a streaming music client.
//!
//! [`audio::AudioEngine`] owns a single output stream and schedules one
//! decoded track at a time. [`coordinator::PlaybackCoordinator`] sits on top
//! and decides what plays next from the playlist, the queue and the history.

pub mod audio;
pub mod config;
pub mod coordinator;
pub mod library;
pub mod runtime;
