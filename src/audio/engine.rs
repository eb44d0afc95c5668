//! Synchronous playback state machine.
//!
//! `EngineCore` owns the audio graph, the resident asset and the session. It
//! never blocks on I/O: a play or load that needs audio hands back a
//! [`LoadTicket`], and whoever performed the fetch reports the outcome through
//! [`EngineCore::finish_load`]. Every `play`, `load` and `stop` bumps a
//! generation counter, and a completion whose ticket carries an older
//! generation is dropped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::library::Track;

use super::analyser::{FREQUENCY_BIN_COUNT, SpectrumAnalyser};
use super::asset::DecodedAsset;
use super::clock::{Clock, MonotonicClock};
use super::error::{EngineError, LoadError, validate_track};
use super::events::EventBus;
use super::session::PlaybackSession;
use super::sink::AudioGraph;
use super::types::{
    EngineEvent, HaltReason, PlaybackHandle, PlaybackInfo, Position, Progress, Transport,
};

/// A fetch the caller must perform and report back.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub generation: u64,
    pub track: Track,
    /// Start playback from 0 as soon as the asset is ready.
    pub autoplay: bool,
}

/// Outcome of [`EngineCore::play`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayStep {
    /// The asset was resident and playback has started.
    Started,
    Fetch(LoadTicket),
}

/// Outcome of [`EngineCore::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStep {
    Resident,
    /// The same track is already being fetched under this generation.
    Pending(u64),
    Fetch(LoadTicket),
}

/// Outcome of [`EngineCore::finish_load`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Ready,
    /// A newer request took over; the outcome was discarded.
    Stale,
}

pub struct EngineCore<G, C = MonotonicClock> {
    graph: G,
    clock: C,
    events: EventBus,
    playback: PlaybackHandle,
    analyser: SpectrumAnalyser,
    asset: Option<Arc<DecodedAsset>>,
    track: Option<Track>,
    session: PlaybackSession,
    generation: u64,
    pending: Option<LoadTicket>,
}

impl<G: AudioGraph, C: Clock> EngineCore<G, C> {
    pub fn new(
        mut graph: G,
        clock: C,
        events: EventBus,
        playback: PlaybackHandle,
        initial_volume: f32,
    ) -> Self {
        graph.set_gain(initial_volume);
        let core = Self {
            graph,
            clock,
            events,
            playback,
            analyser: SpectrumAnalyser::new(),
            asset: None,
            track: None,
            session: PlaybackSession::new(initial_volume),
            generation: 0,
            pending: None,
        };
        core.publish();
        core
    }

    /// Start fetching `track` without playing it. No-op if it is resident.
    pub fn load(&mut self, track: &Track) -> Result<LoadStep, EngineError> {
        self.validate(track)?;
        if self.is_resident(&track.id) {
            return Ok(LoadStep::Resident);
        }
        if let Some(pending) = self.pending.as_ref().filter(|p| p.track.id == track.id) {
            return Ok(LoadStep::Pending(pending.generation));
        }
        Ok(LoadStep::Fetch(self.begin_load(track.clone(), false)))
    }

    /// Play `track` from the beginning, replacing whatever is active.
    pub fn play(&mut self, track: Track) -> Result<PlayStep, EngineError> {
        self.validate(&track)?;
        self.halt_source(HaltReason::Replaced);

        if self.is_resident(&track.id) {
            self.generation = self.generation.wrapping_add(1);
            if self.pending.take().is_some() {
                self.emit(EngineEvent::Loading(false));
            }
            self.track = Some(track);
            let position = self.start(0.0);
            self.emit(EngineEvent::Play(position));
            return Ok(PlayStep::Started);
        }

        // Loading a different track evicts the old asset.
        self.asset = None;
        self.analyser.reset();
        self.session.reset();
        self.track = Some(track.clone());
        Ok(PlayStep::Fetch(self.begin_load(track, true)))
    }

    fn begin_load(&mut self, track: Track, autoplay: bool) -> LoadTicket {
        self.generation = self.generation.wrapping_add(1);
        let ticket = LoadTicket {
            generation: self.generation,
            track,
            autoplay,
        };
        debug!(
            track = %ticket.track.id,
            generation = ticket.generation,
            autoplay,
            "load started"
        );
        self.pending = Some(ticket.clone());
        self.emit(EngineEvent::Loading(true));
        ticket
    }

    /// Apply the result of the fetch and decode for `ticket`.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        outcome: Result<DecodedAsset, LoadError>,
    ) -> Result<LoadStatus, EngineError> {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|p| p.generation == ticket.generation && p.generation == self.generation);
        if !current {
            debug!(
                track = %ticket.track.id,
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale load"
            );
            return Ok(LoadStatus::Stale);
        }
        self.pending = None;

        let asset = match outcome {
            Ok(asset) => asset,
            Err(err) => {
                warn!(track = %ticket.track.id, "load failed: {err}");
                let interrupted = self.session.transport() != Transport::Stopped;
                self.halt_source(HaltReason::Stopped);
                self.session.reset();
                self.asset = None;
                self.track = None;
                self.analyser.reset();
                if interrupted {
                    self.emit(EngineEvent::Stop);
                }
                self.emit(EngineEvent::Loading(false));
                self.emit(EngineEvent::Error(err.to_string()));
                return Err(err.into());
            }
        };

        if !ticket.autoplay && self.session.transport() != Transport::Stopped {
            // A standalone load of another track takes over the graph.
            self.halt_source(HaltReason::Replaced);
            self.session.reset();
            self.emit(EngineEvent::Stop);
        }

        let asset = Arc::new(asset);
        let duration = asset.duration();
        debug!(track = %ticket.track.id, duration, "load finished");
        self.asset = Some(asset);
        self.track = Some(ticket.track);
        self.analyser.reset();
        self.emit(EngineEvent::Loading(false));
        self.emit(EngineEvent::Loaded { duration });

        if ticket.autoplay {
            let position = self.start(0.0);
            self.emit(EngineEvent::Play(position));
        }
        Ok(LoadStatus::Ready)
    }

    pub fn pause(&mut self) {
        if !self.session.is_playing() {
            return;
        }
        let elapsed = self.current_time();
        self.halt_source(HaltReason::Paused);
        self.session.pause_at(elapsed);
        self.emit(EngineEvent::Pause(Position {
            current_time: elapsed,
            duration: self.duration(),
        }));
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        if !self.session.is_paused() {
            return Ok(());
        }
        if self.asset.is_none() {
            return Err(self.fail(EngineError::NoAsset));
        }
        let offset = self.current_time();
        let position = self.start(offset);
        self.emit(EngineEvent::Play(position));
        Ok(())
    }

    /// Halt playback and drop any pending load. Idempotent.
    pub fn stop(&mut self) {
        self.halt_source(HaltReason::Stopped);
        self.session.reset();
        if !self.track.as_ref().is_some_and(|t| self.is_resident(&t.id)) {
            self.track = None;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.pending.take().is_some() {
            self.emit(EngineEvent::Loading(false));
        }
        self.emit(EngineEvent::Stop);
        self.emit(EngineEvent::ClearError);
    }

    /// Jump to `time` seconds and keep playing from there.
    pub fn seek(&mut self, time: f64) -> Result<(), EngineError> {
        let Some(asset) = self.asset.clone() else {
            return Err(self.fail(EngineError::NoAsset));
        };
        let target = if time.is_nan() {
            0.0
        } else {
            time.clamp(0.0, asset.duration())
        };
        self.halt_source(HaltReason::Replaced);
        let position = self.start(target);
        self.emit(EngineEvent::TimeUpdate(Progress::new(target, position.duration)));
        self.emit(EngineEvent::Play(position));
        Ok(())
    }

    /// Set the gain. The range is the caller's business.
    pub fn set_volume(&mut self, volume: f32) {
        self.session.set_volume(volume);
        self.graph.set_gain(self.session.effective_gain());
        self.emit(EngineEvent::VolumeChange(volume));
    }

    /// Flip mute and return the new state.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.session.is_muted();
        self.session.set_muted(muted);
        let gain = self.session.effective_gain();
        self.graph.set_gain(gain);
        self.emit(EngineEvent::VolumeChange(gain));
        muted
    }

    pub fn frequency_data(&mut self) -> Vec<u8> {
        let Some(asset) = self.asset.clone() else {
            return Vec::new();
        };
        if !self.session.is_playing() {
            return vec![0; FREQUENCY_BIN_COUNT];
        }
        let at = self.current_time();
        self.analyser.analyse(&asset, at)
    }

    /// Periodic driver: detects natural end, otherwise reports progress.
    pub fn tick(&mut self) {
        if !self.session.is_playing() {
            return;
        }
        if self.graph.source_finished() {
            self.halt_source(HaltReason::Finished);
            return;
        }
        let progress = Progress::new(self.current_time(), self.duration());
        self.emit(EngineEvent::TimeUpdate(progress));
    }

    /// Fade out and release the output.
    pub fn shutdown(&mut self, fade_out: Duration) {
        if self.session.is_playing() {
            self.graph.fade_out(fade_out);
        }
        self.halt_source(HaltReason::Stopped);
        self.session.reset();
        self.pending = None;
        self.publish();
    }

    /// The one place a source is discarded. Only a finished source reports `ended`.
    fn halt_source(&mut self, reason: HaltReason) {
        trace!(?reason, "halting source");
        self.graph.halt_source();
        if reason == HaltReason::Finished {
            debug!(track = ?self.track.as_ref().map(|t| &t.id), "track ended");
            self.session.reset();
            self.emit(EngineEvent::Ended);
        }
    }

    fn start(&mut self, offset: f64) -> Position {
        let duration = self.duration();
        if let Some(asset) = self.asset.clone() {
            self.graph
                .start_source(&asset, offset, self.session.effective_gain());
            self.session.start_at(offset, self.clock.now());
        }
        Position {
            current_time: offset,
            duration,
        }
    }

    fn validate(&self, track: &Track) -> Result<(), EngineError> {
        validate_track(track).map_err(|e| self.fail(e))
    }

    fn fail(&self, err: EngineError) -> EngineError {
        self.emit(EngineEvent::Error(err.to_string()));
        err
    }

    fn is_resident(&self, track_id: &str) -> bool {
        self.asset.as_ref().is_some_and(|a| a.track_id() == track_id)
    }

    fn emit(&self, event: EngineEvent) {
        self.publish();
        self.events.emit(&event);
    }

    fn publish(&self) {
        if let Ok(mut info) = self.playback.lock() {
            *info = PlaybackInfo {
                track: self.track.clone(),
                session: self.session,
                duration: self.asset.as_ref().map(|a| a.duration()),
            };
        }
    }

    /// Elapsed seconds, clamped to the asset length.
    pub fn current_time(&self) -> f64 {
        let t = self.session.current_time(self.clock.now()).max(0.0);
        match self.asset.as_ref() {
            Some(asset) => t.min(asset.duration()),
            None => t,
        }
    }

    /// Length of the resident asset, 0 when nothing is loaded.
    pub fn duration(&self) -> f64 {
        self.asset.as_ref().map_or(0.0, |a| a.duration())
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn transport(&self) -> Transport {
        self.session.transport()
    }

    pub fn volume(&self) -> f32 {
        self.session.volume()
    }

    pub fn is_muted(&self) -> bool {
        self.session.is_muted()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }
}
