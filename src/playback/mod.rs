//! Playback: per-recording lifecycle plus the audio output sink.

pub mod controller;
pub mod sink;

pub use controller::{PlayOutcome, PlaybackController, PlaybackNote, UiState, LOAD_TIMEOUT};
pub use sink::{AudioOutput, CpalAudioOutput, PlaybackHandle};
