//! Sequencing state: what plays next, what played before.
//!
//! Nothing here touches audio. Resolution methods return a [`Step`] and the
//! coordinator carries it out.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::library::Track;

/// User-toggled playback modes. They survive track changes and `reset`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PlaybackModes {
    pub shuffle: bool,
    pub repeat: bool,
}

/// What the coordinator should do after resolving next or previous.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Play { track: Track, update_sequence: bool },
    /// Nothing left: stop and abandon the session.
    Stop,
    /// Nothing to do.
    Stay,
}

impl Step {
    fn play(track: Track) -> Self {
        Step::Play {
            track,
            update_sequence: true,
        }
    }
}

#[derive(Debug)]
pub struct Sequence {
    playlist: Vec<Track>,
    index: Option<usize>,
    queue: VecDeque<Track>,
    history: VecDeque<Track>,
    history_limit: usize,
    modes: PlaybackModes,
    rng: StdRng,
}

impl Sequence {
    pub fn new(history_limit: usize) -> Self {
        Self::with_rng(history_limit, StdRng::from_entropy())
    }

    /// Use a specific RNG, e.g. a seeded one for reproducible shuffles.
    pub fn with_rng(history_limit: usize, rng: StdRng) -> Self {
        Self {
            playlist: Vec::new(),
            index: None,
            queue: VecDeque::new(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            modes: PlaybackModes::default(),
            rng,
        }
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub fn queue(&self) -> &VecDeque<Track> {
        &self.queue
    }

    pub fn history(&self) -> &VecDeque<Track> {
        &self.history
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn modes(&self) -> PlaybackModes {
        self.modes
    }

    pub fn set_modes(&mut self, modes: PlaybackModes) {
        self.modes = modes;
    }

    /// Track at the current playlist index.
    pub fn current(&self) -> Option<&Track> {
        self.index.and_then(|i| self.playlist.get(i))
    }

    fn position(&self, track: &Track) -> Option<usize> {
        self.playlist.iter().position(|t| t.same_as(track))
    }

    /// Replace the playlist. Queue, history and index start over.
    pub fn set_playlist(&mut self, tracks: Vec<Track>) {
        self.playlist = tracks;
        self.index = None;
        self.queue.clear();
        self.history.clear();
    }

    /// Forget everything except the modes.
    pub fn reset(&mut self) {
        self.set_playlist(Vec::new());
    }

    pub fn add_to_queue(&mut self, track: Track) {
        self.queue.push_back(track);
    }

    pub fn remove_from_queue(&mut self, index: usize) -> Option<Track> {
        self.queue.remove(index)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.modes.repeat = !self.modes.repeat;
        self.modes.repeat
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.modes.shuffle = !self.modes.shuffle;
        self.modes.shuffle
    }

    /// Bookkeeping for a track that is about to play.
    ///
    /// With `update_sequence`, an empty playlist becomes `[track]` and a track
    /// found in the playlist moves the index to it. A track that is not in a
    /// non-empty playlist leaves the index alone.
    pub fn record_play(&mut self, track: &Track, update_sequence: bool) {
        if update_sequence {
            if self.playlist.is_empty() {
                self.playlist.push(track.clone());
                self.index = Some(0);
            } else if let Some(i) = self.position(track) {
                self.index = Some(i);
            }
        }
        self.history.push_back(track.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Resolve the next track. `current` is what is playing now, if known.
    pub fn next(&mut self, current: Option<&Track>) -> Step {
        if let Some(track) = self.queue.pop_front() {
            return Step::Play {
                track,
                update_sequence: false,
            };
        }

        if self.modes.repeat {
            if let Some(track) = current.or_else(|| self.current()) {
                return Step::play(track.clone());
            }
        }

        let len = self.playlist.len();
        let base = self.index.or_else(|| current.and_then(|t| self.position(t)));

        if let Some(i) = base.filter(|i| *i < len) {
            if self.modes.shuffle {
                let j = self.random_index_except(i);
                return Step::play(self.playlist[j].clone());
            }
            let j = (i + 1) % len;
            if j == i {
                return Step::Stop;
            }
            return Step::play(self.playlist[j].clone());
        }

        match self.playlist.first() {
            Some(first) => Step::play(first.clone()),
            None => Step::Stop,
        }
    }

    /// Resolve the previous track. Never asks to stop.
    pub fn previous(&mut self, current: Option<&Track>) -> Step {
        if let Some(track) = self.take_previous(current) {
            return Step::play(track);
        }

        if self.playlist.is_empty() {
            return Step::Stay;
        }

        let Some(i) = current.and_then(|t| self.position(t)) else {
            return Step::play(self.playlist[0].clone());
        };

        if self.modes.shuffle {
            let j = self.random_index_except(i);
            return Step::play(self.playlist[j].clone());
        }

        let len = self.playlist.len();
        let j = (i + len - 1) % len;
        if j == i {
            return Step::Stay;
        }
        Step::play(self.playlist[j].clone())
    }

    /// Resolution after the current track finished on its own.
    pub fn after_ended(&mut self, current: Option<&Track>) -> Step {
        let Some(current) = current.cloned().or_else(|| self.current().cloned()) else {
            return Step::Stop;
        };
        if self.modes.repeat {
            return Step::play(current);
        }
        self.next(Some(&current))
    }

    /// Pop the history entry played before `current`.
    fn take_previous(&mut self, current: Option<&Track>) -> Option<Track> {
        let newest_is_current = matches!(
            (current, self.history.back()),
            (Some(c), Some(last)) if last.same_as(c)
        );
        if newest_is_current {
            if self.history.len() < 2 {
                return None;
            }
            self.history.pop_back();
        }
        self.history.pop_back()
    }

    /// Uniform index other than `current`; `current` itself for a single track.
    fn random_index_except(&mut self, current: usize) -> usize {
        let len = self.playlist.len();
        if len <= 1 {
            return current.min(len.saturating_sub(1));
        }
        let j = self.rng.gen_range(0..len - 1);
        if j >= current { j + 1 } else { j }
    }
}
