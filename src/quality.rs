//! Quality profile table for capture sessions.
//!
//! Maps each quality tier to a fixed bundle of capture parameters. A profile
//! is selected before a session starts and never changes while the session
//! is active.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Capture quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Studio capture: 48 kHz stereo, 24-bit, no input processing
    #[default]
    High,
    /// Balanced capture: 44.1 kHz stereo, 16-bit, input processing enabled
    Medium,
    /// Compact capture: 22.05 kHz mono, 16-bit, input processing enabled
    Low,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl QualityTier {
    /// Returns the capture parameters for this tier.
    pub fn profile(self) -> &'static QualityProfile {
        match self {
            Self::High => &HIGH,
            Self::Medium => &MEDIUM,
            Self::Low => &LOW,
        }
    }
}

/// Full set of capture parameters for one quality tier.
///
/// The processing flags (echo cancellation, noise suppression, automatic
/// gain) are requested from the platform where it supports them and logged
/// otherwise. They never change the wire format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityProfile {
    pub tier: QualityTier,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Preferred wire sample width in bits. 24 falls back to 16 when the
    /// capture path cannot honor it.
    pub bit_depth: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Requested capture latency in seconds, advisory only
    pub latency_hint: f32,
}

static HIGH: QualityProfile = QualityProfile {
    tier: QualityTier::High,
    sample_rate: 48_000,
    channels: 2,
    bit_depth: 24,
    echo_cancellation: false,
    noise_suppression: false,
    auto_gain_control: false,
    latency_hint: 0.0,
};

static MEDIUM: QualityProfile = QualityProfile {
    tier: QualityTier::Medium,
    sample_rate: 44_100,
    channels: 2,
    bit_depth: 16,
    echo_cancellation: true,
    noise_suppression: true,
    auto_gain_control: true,
    latency_hint: 0.01,
};

static LOW: QualityProfile = QualityProfile {
    tier: QualityTier::Low,
    sample_rate: 22_050,
    channels: 1,
    bit_depth: 16,
    echo_cancellation: true,
    noise_suppression: true,
    auto_gain_control: true,
    latency_hint: 0.02,
};
