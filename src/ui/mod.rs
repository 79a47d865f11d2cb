//! Terminal screens shared by the commands.
//!
//! # Screens
//! - `record`: recording session view with waveform and meters
//! - `library`: recording list with playback badges
//! - `error`: full-screen error display

pub mod error;
pub mod library;
pub mod record;

pub use error::ErrorScreen;
pub use library::{LibraryCommand, LibraryScreen, RowView};
pub use record::{RecordCommand, RecordScreen, RecordView};
