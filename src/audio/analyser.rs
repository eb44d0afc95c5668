//! Frequency analysis of the resident asset at the playback position.
//!
//! Output matches a browser analyser node: 256-point FFT, Blackman window,
//! 0.8 time smoothing and a -100..-30 dB range mapped onto a byte.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use super::asset::DecodedAsset;

pub const FFT_SIZE: usize = 256;
pub const FREQUENCY_BIN_COUNT: usize = FFT_SIZE / 2;

const SMOOTHING: f32 = 0.8;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

pub(super) struct SpectrumAnalyser {
    window: Vec<f32>,
    input: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrumAnalyser {
    pub(super) fn new() -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(FFT_SIZE);
        let n = FFT_SIZE as f32;
        let window = (0..FFT_SIZE)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();
        Self {
            window,
            input: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            smoothed: vec![0.0; FREQUENCY_BIN_COUNT],
            fft,
        }
    }

    /// Byte magnitudes for the window of samples ending at `seconds`.
    pub(super) fn analyse(&mut self, asset: &DecodedAsset, seconds: f64) -> Vec<u8> {
        let frames = asset.mono_window(asset.frame_at(seconds), FFT_SIZE);
        for (slot, (sample, w)) in self
            .input
            .iter_mut()
            .zip(frames.iter().zip(self.window.iter()))
        {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process(&mut self.input);

        let n = FFT_SIZE as f32;
        self.smoothed
            .iter_mut()
            .zip(self.input.iter())
            .map(|(prev, bin)| {
                let magnitude = bin.norm() / n;
                *prev = SMOOTHING * *prev + (1.0 - SMOOTHING) * magnitude;
                to_byte(*prev)
            })
            .collect()
    }

    /// Forget smoothing history, e.g. after a track change.
    pub(super) fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

fn to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DB) / (MAX_DB - MIN_DB);
    scaled.clamp(0.0, 255.0) as u8
}
