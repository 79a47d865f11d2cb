//! Error types for the capture, playback and server flows.
//!
//! Every kind carries a message a user can act on. Handlers at the command
//! boundary render them to the status line or the error screen instead of
//! letting them escape as raw backend text.

use thiserror::Error;

/// Capture device acquisition failures.
///
/// The three variants stay distinct so the user is told what to fix: grant
/// access, plug in a device, or pick another quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("microphone access was denied. Grant microphone permission and try again")]
    PermissionDenied,
    #[error("no capture device matches '{device}'. Connect a microphone or fix the configured device")]
    NotFound { device: String },
    #[error(
        "the capture device cannot record {channels} channel(s) at {sample_rate} Hz. Try a different quality"
    )]
    UnsupportedProfile { sample_rate: u32, channels: u16 },
}

/// Recording session lifecycle violations and stream failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("a recording session is already active")]
    AlreadyActive,
    #[error("no recording in progress")]
    NotRecording,
    #[error("recording is not paused")]
    NotPaused,
    #[error("recording is already paused")]
    AlreadyPaused,
    #[error("audio stream failed: {0}")]
    Stream(String),
}

/// The preferred sample encoding is unavailable; capture continues at the
/// fallback width. Reported once, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{requested_bits}-bit encoding is unavailable on this device, recording at {fallback_bits}-bit")]
pub struct EncodingUnsupported {
    pub requested_bits: u16,
    pub fallback_bits: u16,
}

/// Playback failures. All of them are recoverable per entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("playback of '{filename}' failed: {detail}")]
    Media { filename: String, detail: String },
    #[error("unknown recording '{filename}'")]
    UnknownRecording { filename: String },
    #[error("'{filename}' is not a valid recording name")]
    InvalidName { filename: String },
}

/// Studio server request failures.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("could not connect to the studio server at {url}. Check that it is running")]
    Connect { url: String },
    #[error("the studio server did not respond in time")]
    Timeout,
    #[error("the studio server rejected the request (status {status}): {detail}")]
    Status { status: u16, detail: String },
    #[error("'{filename}' is not a valid recording name")]
    InvalidName { filename: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from the studio server: {0}")]
    Decode(String),
}
