use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::library::Track;

use super::clock::{Clock, MonotonicClock};
use super::error::EngineError;
use super::events::{EventBus, Subscription};
use super::fetch::TrackFetcher;
use super::sink::{AudioGraph, RodioGraph};
use super::thread::{EngineCmd, Reply, ThreadConfig, spawn_engine_thread};
use super::types::{EngineEvent, EventKind, PlaybackHandle, PlaybackInfo, Transport};

/// Handle to the audio engine.
///
/// Commands are acknowledged once the engine thread has applied them; `play`
/// and `load` resolve when the audio is resident (or the load fails or is
/// superseded). Position, duration and volume are read from a shared snapshot
/// without a round trip.
pub struct AudioEngine {
    tx: mpsc::UnboundedSender<EngineCmd>,
    playback: PlaybackHandle,
    events: EventBus,
    clock: MonotonicClock,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioEngine {
    /// Open the default output device and start the engine thread.
    pub fn spawn(
        fetcher: Arc<dyn TrackFetcher>,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        Self::with_graph(RodioGraph::open, fetcher, settings)
    }

    /// Start the engine thread on a graph built by `make_graph` inside that thread.
    pub fn with_graph<G, F>(
        make_graph: F,
        fetcher: Arc<dyn TrackFetcher>,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError>
    where
        G: AudioGraph + 'static,
        F: FnOnce() -> Result<G, EngineError> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let playback: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));
        let events = EventBus::new();
        let clock = MonotonicClock::new();

        let join = spawn_engine_thread(
            make_graph,
            fetcher,
            rx,
            ThreadConfig {
                events: events.clone(),
                playback: playback.clone(),
                clock,
                initial_volume: settings.initial_volume,
                tick_interval: settings.time_update_interval(),
            },
        )?;
        debug!("audio engine started");

        Ok(Self {
            tx,
            playback,
            events,
            clock,
            join: Mutex::new(Some(join)),
        })
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> EngineCmd,
    ) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    pub async fn load(&self, track: &Track) -> Result<(), EngineError> {
        let track = track.clone();
        self.request(|reply| EngineCmd::Load { track, reply }).await
    }

    pub async fn play(&self, track: &Track) -> Result<(), EngineError> {
        let track = track.clone();
        self.request(|reply| EngineCmd::Play { track, reply }).await
    }

    pub async fn pause(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::Resume { reply }).await
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::Stop { reply }).await
    }

    pub async fn seek(&self, time: f64) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::Seek { time, reply }).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::SetVolume { volume, reply }).await
    }

    pub async fn toggle_mute(&self) -> Result<bool, EngineError> {
        self.request(|reply| EngineCmd::ToggleMute { reply }).await
    }

    /// 128 byte-scaled frequency bins; empty when nothing is loaded.
    pub async fn frequency_data(&self) -> Vec<u8> {
        self.request(|reply| EngineCmd::FrequencyData { reply })
            .await
            .unwrap_or_default()
    }

    fn snapshot(&self) -> PlaybackInfo {
        self.playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_time(&self) -> f64 {
        let info = self.snapshot();
        let t = info.session.current_time(self.clock.now()).max(0.0);
        info.duration.map_or(t, |d| t.min(d))
    }

    pub fn duration(&self) -> Option<f64> {
        self.snapshot().duration
    }

    pub fn current_track(&self) -> Option<Track> {
        self.snapshot().track
    }

    pub fn transport(&self) -> Transport {
        self.snapshot().session.transport()
    }

    pub fn volume(&self) -> f32 {
        self.snapshot().session.volume()
    }

    pub fn is_muted(&self) -> bool {
        self.snapshot().session.is_muted()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.events.subscribe_all(listener)
    }

    /// Fade the active source out, then stop the engine thread and wait for it.
    pub async fn shutdown(&self, fade_out: Duration) {
        let _ = self.tx.send(EngineCmd::Quit { fade_out });
        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(join) = join {
            match tokio::task::spawn_blocking(move || join.join()).await {
                Ok(Ok(())) => debug!("audio engine stopped"),
                _ => warn!("audio engine thread did not exit cleanly"),
            }
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCmd::Quit {
            fade_out: Duration::ZERO,
        });
    }
}
