use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::{EngineError, Transport, validate_track};
use crate::config::PlaybackSettings;
use crate::library::{PlayCounter, Track};

use super::player::Player;
use super::sequence::{PlaybackModes, Sequence, Step};

/// Whether anything has been played in this session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CoordinatorState {
    #[default]
    Idle,
    Active(Track),
}

/// Playlist policy on top of a [`Player`].
///
/// Sequencing dead ends (no next or previous track) never produce errors.
/// Errors from the player are returned as they are, except
/// [`EngineError::Superseded`], which only means a newer request took over.
pub struct PlaybackCoordinator<P: Player> {
    player: Arc<P>,
    sequence: Sequence,
    counter: Option<Arc<dyn PlayCounter>>,
    state: CoordinatorState,
}

impl<P: Player> PlaybackCoordinator<P> {
    pub fn new(player: Arc<P>, settings: &PlaybackSettings) -> Self {
        let mut sequence = Sequence::new(settings.history_limit);
        sequence.set_modes(PlaybackModes {
            shuffle: settings.shuffle,
            repeat: settings.repeat,
        });
        Self::with_sequence(player, sequence)
    }

    pub fn with_sequence(player: Arc<P>, sequence: Sequence) -> Self {
        Self {
            player,
            sequence,
            counter: None,
            state: CoordinatorState::Idle,
        }
    }

    /// Report successful plays to `counter`.
    pub fn with_counter(mut self, counter: Arc<dyn PlayCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn player(&self) -> &Arc<P> {
        &self.player
    }

    pub async fn play_track(
        &mut self,
        track: Track,
        update_sequence: bool,
    ) -> Result<(), EngineError> {
        if validate_track(&track).is_err() {
            // The engine rejects it and reports the error to listeners.
            return self.player.play(&track).await;
        }

        self.sequence.record_play(&track, update_sequence);
        self.state = CoordinatorState::Active(track.clone());
        info!(track = %track.id, "playing {}", track.display());

        match self.player.play(&track).await {
            Ok(()) => {
                if let Some(counter) = self.counter.as_ref() {
                    counter.record_play(&track.id);
                }
                Ok(())
            }
            Err(EngineError::Superseded) => {
                debug!(track = %track.id, "play superseded");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn pause(&self) -> Result<(), EngineError> {
        self.player.pause().await
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        self.player.resume().await
    }

    /// Pause when playing, resume when paused, otherwise start playing.
    pub async fn toggle_pause(&mut self) -> Result<(), EngineError> {
        match self.player.transport() {
            Transport::Playing => self.pause().await,
            Transport::Paused => self.resume().await,
            Transport::Stopped => match self.current_track() {
                Some(track) => self.play_track(track, true).await,
                None => self.play_next().await,
            },
        }
    }

    /// Stop playback and abandon the listening session.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        let result = self.player.stop().await;
        self.sequence.reset();
        self.state = CoordinatorState::Idle;
        result
    }

    pub async fn seek(&self, time: f64) -> Result<(), EngineError> {
        self.player.seek(time).await
    }

    /// Seek relative to the current position.
    pub async fn seek_by(&self, delta: f64) -> Result<(), EngineError> {
        let target = (self.player.current_time() + delta).max(0.0);
        self.player.seek(target).await
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub async fn set_volume(&self, volume: f32) -> Result<(), EngineError> {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.player.set_volume(volume).await
    }

    pub async fn toggle_mute(&self) -> Result<bool, EngineError> {
        self.player.toggle_mute().await
    }

    pub async fn play_next(&mut self) -> Result<(), EngineError> {
        let current = self.current_track();
        let step = self.sequence.next(current.as_ref());
        self.apply(step).await
    }

    pub async fn play_previous(&mut self) -> Result<(), EngineError> {
        let current = self.current_track();
        let step = self.sequence.previous(current.as_ref());
        self.apply(step).await
    }

    /// Auto-advance after the engine reported a natural end.
    pub async fn handle_ended(&mut self) -> Result<(), EngineError> {
        let current = self.session_track();
        let step = self.sequence.after_ended(current.as_ref());
        debug!(?step, "track ended");
        self.apply(step).await
    }

    async fn apply(&mut self, step: Step) -> Result<(), EngineError> {
        match step {
            Step::Play {
                track,
                update_sequence,
            } => self.play_track(track, update_sequence).await,
            Step::Stop => self.stop().await,
            Step::Stay => Ok(()),
        }
    }

    pub fn set_playlist(&mut self, tracks: Vec<Track>) {
        debug!(len = tracks.len(), "playlist replaced");
        self.sequence.set_playlist(tracks);
    }

    pub fn add_to_queue(&mut self, track: Track) {
        self.sequence.add_to_queue(track);
    }

    pub fn remove_from_queue(&mut self, index: usize) -> Option<Track> {
        self.sequence.remove_from_queue(index)
    }

    pub fn clear_queue(&mut self) {
        self.sequence.clear_queue();
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.sequence.toggle_repeat()
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.sequence.toggle_shuffle()
    }

    /// What the player is on, falling back to the playlist position.
    pub fn current_track(&self) -> Option<Track> {
        self.session_track()
            .or_else(|| self.sequence.current().cloned())
    }

    /// The player's track, as long as the session has not been stopped.
    fn session_track(&self) -> Option<Track> {
        match self.state {
            CoordinatorState::Active(_) => self.player.current_track(),
            CoordinatorState::Idle => None,
        }
    }

    pub fn playlist(&self) -> &[Track] {
        self.sequence.playlist()
    }

    pub fn queue(&self) -> &VecDeque<Track> {
        self.sequence.queue()
    }

    pub fn history(&self) -> &VecDeque<Track> {
        self.sequence.history()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.sequence.index()
    }

    pub fn modes(&self) -> PlaybackModes {
        self.sequence.modes()
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }
}
