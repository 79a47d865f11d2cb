//! Recording session management: capture, timing, chunking and lifecycle.

pub mod capture;
pub mod chunks;
pub mod clock;
pub mod controller;

pub use capture::{CaptureBackend, CaptureHandle, CpalCaptureBackend, SampleTap};
pub use chunks::{ChunkBuffer, UploadPayload, DEFAULT_CHUNK_INTERVAL_MS};
pub use clock::{SessionClock, Ticker};
pub use controller::{ControlSurface, FinishedSession, RecordingController, SessionState};
