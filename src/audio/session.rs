use super::types::Transport;

/// Mutable playback bookkeeping for the single stream.
///
/// Elapsed time is never polled from the output; it is derived from an anchor:
/// while playing it is `now - anchor_clock`, otherwise the value captured at
/// the last anchor. Pause, resume and seek only move the anchor, which keeps
/// the arithmetic exact across any number of segments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaybackSession {
    transport: Transport,
    elapsed_at_anchor: f64,
    anchor_clock: f64,
    volume: f32,
    muted: bool,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PlaybackSession {
    pub fn new(volume: f32) -> Self {
        Self {
            transport: Transport::Stopped,
            elapsed_at_anchor: 0.0,
            anchor_clock: 0.0,
            volume,
            muted: false,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.transport == Transport::Paused
    }

    /// Elapsed seconds into the track at clock reading `now`.
    pub fn current_time(&self, now: f64) -> f64 {
        match self.transport {
            Transport::Playing => now - self.anchor_clock,
            Transport::Paused | Transport::Stopped => self.elapsed_at_anchor,
        }
    }

    /// Anchor a source that starts `offset` seconds into the track at `now`.
    pub fn start_at(&mut self, offset: f64, now: f64) {
        self.transport = Transport::Playing;
        self.elapsed_at_anchor = offset;
        self.anchor_clock = now - offset;
    }

    /// Freeze the position at `elapsed`.
    pub fn pause_at(&mut self, elapsed: f64) {
        self.transport = Transport::Paused;
        self.elapsed_at_anchor = elapsed;
    }

    /// Back to neither playing nor paused, offset 0. Volume and mute survive.
    pub fn reset(&mut self) {
        self.transport = Transport::Stopped;
        self.elapsed_at_anchor = 0.0;
        self.anchor_clock = 0.0;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Gain actually applied to the output.
    pub fn effective_gain(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn playing_time_follows_the_clock() {
        let mut s = PlaybackSession::default();
        s.start_at(0.0, 100.0);
        assert_relative_eq!(s.current_time(100.0), 0.0);
        assert_relative_eq!(s.current_time(102.5), 2.5);
    }

    #[test]
    fn paused_time_is_frozen() {
        let mut s = PlaybackSession::default();
        s.start_at(0.0, 10.0);
        s.pause_at(s.current_time(14.0));
        assert!(s.is_paused());
        assert!(!s.is_playing());
        assert_relative_eq!(s.current_time(14.0), 4.0);
        assert_relative_eq!(s.current_time(999.0), 4.0);
    }

    #[test]
    fn restarting_at_an_offset_keeps_time_continuous() {
        let mut s = PlaybackSession::default();
        s.start_at(0.0, 1.0);
        let captured = s.current_time(3.75);
        s.pause_at(captured);
        s.start_at(captured, 50.0);
        assert_relative_eq!(s.current_time(50.0), captured, epsilon = 1e-9);
        assert_relative_eq!(s.current_time(51.0), captured + 1.0, epsilon = 1e-9);
    }

    #[test]
    fn reset_keeps_volume_and_mute() {
        let mut s = PlaybackSession::new(0.3);
        s.set_muted(true);
        s.start_at(12.0, 20.0);
        s.reset();
        assert_eq!(s.transport(), Transport::Stopped);
        assert_relative_eq!(s.current_time(500.0), 0.0);
        assert_relative_eq!(s.volume(), 0.3);
        assert!(s.is_muted());
        assert_relative_eq!(s.effective_gain(), 0.0);
    }
}
