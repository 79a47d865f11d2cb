//! Configuration management for recbooth.
//!
//! Application settings live in a TOML file in the user's config directory.

pub mod file;

pub use file::{get_config_path, AudioConfig, RecboothConfig, ServerConfig};
