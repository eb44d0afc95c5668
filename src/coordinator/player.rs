use async_trait::async_trait;

use crate::audio::{AudioEngine, EngineError, Transport};
use crate::library::Track;

/// The playback operations the coordinator drives.
#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, track: &Track) -> Result<(), EngineError>;
    async fn pause(&self) -> Result<(), EngineError>;
    async fn resume(&self) -> Result<(), EngineError>;
    async fn stop(&self) -> Result<(), EngineError>;
    async fn seek(&self, time: f64) -> Result<(), EngineError>;
    async fn set_volume(&self, volume: f32) -> Result<(), EngineError>;
    async fn toggle_mute(&self) -> Result<bool, EngineError>;

    fn current_track(&self) -> Option<Track>;
    fn current_time(&self) -> f64;
    fn transport(&self) -> Transport;
    fn volume(&self) -> f32;
}

#[async_trait]
impl Player for AudioEngine {
    async fn play(&self, track: &Track) -> Result<(), EngineError> {
        AudioEngine::play(self, track).await
    }

    async fn pause(&self) -> Result<(), EngineError> {
        AudioEngine::pause(self).await
    }

    async fn resume(&self) -> Result<(), EngineError> {
        AudioEngine::resume(self).await
    }

    async fn stop(&self) -> Result<(), EngineError> {
        AudioEngine::stop(self).await
    }

    async fn seek(&self, time: f64) -> Result<(), EngineError> {
        AudioEngine::seek(self, time).await
    }

    async fn set_volume(&self, volume: f32) -> Result<(), EngineError> {
        AudioEngine::set_volume(self, volume).await
    }

    async fn toggle_mute(&self) -> Result<bool, EngineError> {
        AudioEngine::toggle_mute(self).await
    }

    fn current_track(&self) -> Option<Track> {
        AudioEngine::current_track(self)
    }

    fn current_time(&self) -> f64 {
        AudioEngine::current_time(self)
    }

    fn transport(&self) -> Transport {
        AudioEngine::transport(self)
    }

    fn volume(&self) -> f32 {
        AudioEngine::volume(self)
    }
}
