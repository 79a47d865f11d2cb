//! Application command handlers for recbooth.
//!
//! This module organizes command handling into separate submodules, each responsible for a specific
//! application command (recording, library playback, listing).
//!
//! # Commands
//! - `record`: Interactive recording session with upload
//! - `library`: Interactive recording library with playback
//! - `list`: Plain recording listing for scripts
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod library;
pub mod list;
pub mod list_devices;
pub mod logs;
pub mod record;

pub use config::handle_config;
pub use library::handle_library;
pub use list::handle_list;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;
