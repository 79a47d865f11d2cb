//! Live channel-level metering.
//!
//! The monitor runs one iteration per render frame while a session is
//! active: it pulls the newest samples through the capture tap, refreshes
//! the spectrum, and folds the magnitude array into two 0-100 channel
//! levels (lower half feeds the left meter, upper half the right). It is
//! presentation state only and never feeds the recorded signal.

pub mod spectrum;

pub use spectrum::{SpectrumTap, BIN_COUNT, FFT_SIZE};

use crate::session::SampleTap;

/// Meter values for one frame, scaled 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLevels {
    pub left: u8,
    pub right: u8,
}

impl ChannelLevels {
    pub fn peak(self) -> u8 {
        self.left.max(self.right)
    }
}

/// Per-frame level meter fed by a capture tap.
pub struct LevelMonitor {
    tap: Option<(SampleTap, SpectrumTap)>,
    levels: ChannelLevels,
    peak_threshold: u8,
}

impl LevelMonitor {
    pub fn new(peak_threshold: u8) -> Self {
        Self {
            tap: None,
            levels: ChannelLevels::default(),
            peak_threshold,
        }
    }

    /// Connects the monitor to a session's capture tap.
    pub fn attach(&mut self, tap: SampleTap) {
        self.tap = Some((tap, SpectrumTap::new()));
        self.levels = ChannelLevels::default();
    }

    /// One iteration. Returns `None` when no tap is attached: a detached
    /// monitor stays silent instead of failing.
    pub fn frame(&mut self) -> Option<ChannelLevels> {
        let (tap, spectrum) = self.tap.as_mut()?;
        let samples = tap.recent(FFT_SIZE);
        spectrum.update(&samples);
        self.levels = split_levels(spectrum.bins());
        Some(self.levels)
    }

    pub fn levels(&self) -> ChannelLevels {
        self.levels
    }

    /// True when either channel crosses the flash threshold.
    pub fn is_peaking(&self) -> bool {
        self.levels.peak() > self.peak_threshold
    }

    /// Detaches the tap and zeroes the meters. Constant time; nothing runs
    /// after cancellation.
    pub fn cancel(&mut self) {
        self.tap = None;
        self.levels = ChannelLevels::default();
    }

    pub fn is_attached(&self) -> bool {
        self.tap.is_some()
    }
}

/// Halves the magnitude array and averages each half onto the 0-100 scale.
fn split_levels(bins: &[u8; BIN_COUNT]) -> ChannelLevels {
    let half = BIN_COUNT / 2;
    ChannelLevels {
        left: average_percent(&bins[..half]),
        right: average_percent(&bins[half..]),
    }
}

fn average_percent(bins: &[u8]) -> u8 {
    if bins.is_empty() {
        return 0;
    }
    let sum: u32 = bins.iter().map(|&b| u32::from(b)).sum();
    let average = sum as f32 / bins.len() as f32;
    ((average / 255.0) * 100.0).min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::capture::SharedBuffers;
    use std::sync::{Arc, Mutex};

    fn tap_with_samples(samples: &[i16]) -> SampleTap {
        let shared = Arc::new(Mutex::new(SharedBuffers::default()));
        shared.lock().unwrap().push(samples);
        SampleTap::from_shared(shared)
    }

    #[test]
    fn test_split_levels_halves_the_array() {
        let mut bins = [0u8; BIN_COUNT];
        for bin in bins.iter_mut().take(BIN_COUNT / 2) {
            *bin = 255;
        }
        let levels = split_levels(&bins);
        assert_eq!(levels.left, 100);
        assert_eq!(levels.right, 0);
    }

    #[test]
    fn test_average_percent_scales_to_hundred() {
        assert_eq!(average_percent(&[255, 255]), 100);
        assert_eq!(average_percent(&[0, 0]), 0);
        // 127.5 / 255 is half scale
        assert_eq!(average_percent(&[255, 0]), 50);
        assert_eq!(average_percent(&[]), 0);
    }

    #[test]
    fn test_frame_without_tap_is_none() {
        let mut monitor = LevelMonitor::new(85);
        assert!(monitor.frame().is_none());
        assert_eq!(monitor.levels(), ChannelLevels::default());
    }

    #[test]
    fn test_frame_with_signal_raises_levels() {
        let samples: Vec<i16> = (0..FFT_SIZE)
            .map(|i| {
                let t = i as f32 / 48_000.0;
                ((2.0 * std::f32::consts::PI * 2_000.0 * t).sin() * 20_000.0) as i16
            })
            .collect();
        let mut monitor = LevelMonitor::new(85);
        monitor.attach(tap_with_samples(&samples));
        let levels = monitor.frame().unwrap();
        assert!(levels.left > 0 || levels.right > 0);
    }

    #[test]
    fn test_cancel_is_immediate_and_total() {
        let mut monitor = LevelMonitor::new(85);
        monitor.attach(tap_with_samples(&[1000; 256]));
        monitor.frame();
        monitor.cancel();
        assert!(!monitor.is_attached());
        assert_eq!(monitor.levels(), ChannelLevels::default());
        assert!(monitor.frame().is_none());
    }

    #[test]
    fn test_peak_flash_threshold_is_strict() {
        let mut monitor = LevelMonitor::new(85);
        monitor.levels = ChannelLevels {
            left: 85,
            right: 10,
        };
        assert!(!monitor.is_peaking());
        monitor.levels.left = 86;
        assert!(monitor.is_peaking());
    }
}
