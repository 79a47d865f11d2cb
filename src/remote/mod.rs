//! Studio server integration.

pub mod client;

pub use client::{is_valid_filename, RecordingInfo, StudioClient, UploadReceipt};
