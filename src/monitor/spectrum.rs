//! Frequency analysis tap for the level monitor.
//!
//! A small FFT over the newest capture samples produces the fixed-size
//! magnitude array the monitor folds into channel levels. Magnitudes are
//! byte-scaled over a fixed dBFS window so silence reads as 0 and a hot
//! signal saturates at 255.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// FFT window size. 256 keeps the tap cheap enough for every frame.
pub const FFT_SIZE: usize = 256;

/// Usable magnitude bins, the positive half of the window.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

const DB_FLOOR: f32 = -100.0;
const DB_CEIL: f32 = -30.0;

pub struct SpectrumTap {
    planner: FftPlanner<f32>,
    bins: [u8; BIN_COUNT],
}

impl SpectrumTap {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            bins: [0; BIN_COUNT],
        }
    }

    /// Recomputes bin magnitudes from the newest samples. Shorter inputs
    /// are zero-padded; an empty input clears the bins.
    pub fn update(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            self.bins = [0; BIN_COUNT];
            return;
        }

        let take = samples.len().min(FFT_SIZE);
        let recent = &samples[samples.len() - take..];

        // Hanning window to limit spectral leakage
        let mut buffer: Vec<Complex<f32>> = recent
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let window =
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / take as f32).cos());
                Complex::new(sample as f32 * window / 32_768.0, 0.0)
            })
            .collect();
        buffer.resize(FFT_SIZE, Complex::new(0.0, 0.0));

        let fft = self.planner.plan_fft_forward(FFT_SIZE);
        fft.process(&mut buffer);

        for (bin, value) in self.bins.iter_mut().zip(buffer.iter().take(BIN_COUNT)) {
            let magnitude = value.norm() / (FFT_SIZE as f32 / 2.0);
            let db = if magnitude > 1e-10 {
                20.0 * magnitude.log10()
            } else {
                DB_FLOOR
            };
            let scaled = ((db - DB_FLOOR) / (DB_CEIL - DB_FLOOR) * 255.0).clamp(0.0, 255.0);
            *bin = scaled as u8;
        }
    }

    pub fn bins(&self) -> &[u8; BIN_COUNT] {
        &self.bins
    }
}

impl Default for SpectrumTap {
    fn default() -> Self {
        Self::new()
    }
}
