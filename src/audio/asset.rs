//! Decoded, in-memory audio for the current track.
//!
//! The engine keeps at most one asset resident and re-creates playback
//! sources from it on every start, resume and seek.

use std::io::Cursor;
use std::sync::Arc;

use rodio::{Decoder, Source};

use super::error::LoadError;

/// Interleaved PCM for one track.
#[derive(Debug, Clone)]
pub struct DecodedAsset {
    track_id: String,
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
    duration: f64,
}

impl DecodedAsset {
    /// Wrap already-decoded interleaved samples.
    pub fn from_samples(
        track_id: impl Into<String>,
        samples: Vec<f32>,
        channels: u16,
        sample_rate: u32,
    ) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        let duration = if sample_rate == 0 {
            0.0
        } else {
            frames as f64 / sample_rate as f64
        };
        Self {
            track_id: track_id.into(),
            samples: samples.into(),
            channels,
            sample_rate,
            duration,
        }
    }

    /// Decode a complete audio payload (WAV, MP3, FLAC, Vorbis).
    pub fn decode(track_id: &str, bytes: Vec<u8>) -> Result<Self, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        let decoder =
            Decoder::new(Cursor::new(bytes)).map_err(|e| LoadError::Decode(e.to_string()))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.collect();
        if samples.is_empty() {
            return Err(LoadError::Empty);
        }
        Ok(Self::from_samples(track_id, samples, channels, sample_rate))
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Frame index for a position in seconds, clamped to the asset.
    pub fn frame_at(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let frame = (seconds * self.sample_rate as f64) as usize;
        frame.min(self.frame_count())
    }

    /// Interleaved samples from `seconds` to the end.
    pub fn samples_from(&self, seconds: f64) -> &[f32] {
        let start = self.frame_at(seconds) * self.channels as usize;
        &self.samples[start..]
    }

    /// Mono mix of `frames` frames ending at `end_frame`. Frames before the
    /// start of the asset are zero.
    pub fn mono_window(&self, end_frame: usize, frames: usize) -> Vec<f32> {
        let channels = self.channels as usize;
        let end = end_frame.min(self.frame_count());
        let start = end.saturating_sub(frames);
        let mut out = vec![0.0; frames - (end - start)];
        out.extend((start..end).map(|f| {
            let frame = &self.samples[f * channels..(f + 1) * channels];
            frame.iter().sum::<f32>() / channels as f32
        }));
        out
    }
}
