//! Output side of the engine.
//!
//! Each start, resume or seek creates a fresh `rodio` sink fed from the
//! resident asset at the requested offset. The previous sink is stopped and
//! dropped first, so at most one source is ever audible.

use std::thread;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::debug;

use super::asset::DecodedAsset;
use super::error::EngineError;

/// The audio output the engine drives.
pub trait AudioGraph {
    /// Start a new source reading `asset` from `offset` seconds at `gain`.
    fn start_source(&mut self, asset: &DecodedAsset, offset: f64, gain: f32);

    /// Stop and discard the active source, if any.
    fn halt_source(&mut self);

    fn set_gain(&mut self, gain: f32);

    /// True once the active source has played all of its samples.
    fn source_finished(&self) -> bool;

    /// Ramp the active source down to silence over `duration`.
    fn fade_out(&mut self, duration: Duration);
}

pub struct RodioGraph {
    stream: OutputStream,
    sink: Option<Sink>,
    gain: f32,
}

impl RodioGraph {
    /// Open the default output device.
    pub fn open() -> Result<Self, EngineError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| EngineError::Output(e.to_string()))?;
        // rodio reports the drop of the stream on stderr, which garbles the terminal.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            sink: None,
            gain: 1.0,
        })
    }
}

impl AudioGraph for RodioGraph {
    fn start_source(&mut self, asset: &DecodedAsset, offset: f64, gain: f32) {
        self.halt_source();
        let source = SamplesBuffer::new(
            asset.channels(),
            asset.sample_rate(),
            asset.samples_from(offset).to_vec(),
        );
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(gain);
        sink.append(source);
        debug!(track = asset.track_id(), offset, "source started");
        self.gain = gain;
        self.sink = Some(sink);
    }

    fn halt_source(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(gain);
        }
    }

    fn source_finished(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.empty())
    }

    fn fade_out(&mut self, duration: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let fade_ms = duration.as_millis() as u64;
        if fade_ms == 0 {
            sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_ms / steps).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            sink.set_volume(self.gain * (1.0 - t));
            thread::sleep(Duration::from_millis(step_ms));
        }
        sink.set_volume(0.0);
    }
}
