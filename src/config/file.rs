//! Configuration file management for recbooth.
//!
//! Loading and saving TOML configuration from the user's config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::quality::QualityTier;
use crate::session::DEFAULT_CHUNK_INTERVAL_MS;

/// Studio server connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the studio server
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for the system default input device
    /// - numeric index (0, 1, 2, ...) from `recbooth list-devices`
    /// - full device name from `recbooth list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Quality tier used when `--quality` is not given
    #[serde(default)]
    pub quality: QualityTier,
    /// Meter level (0-100) above which the peak indicator flashes
    #[serde(default = "default_peak_level_threshold")]
    pub peak_level_threshold: u8,
    /// Chunk emission interval in milliseconds
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            quality: QualityTier::default(),
            peak_level_threshold: default_peak_level_threshold(),
            chunk_interval_ms: default_chunk_interval_ms(),
        }
    }
}

fn default_device() -> String {
    "default".to_string()
}

fn default_peak_level_threshold() -> u8 {
    85
}

fn default_chunk_interval_ms() -> u64 {
    DEFAULT_CHUNK_INTERVAL_MS
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecboothConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

impl RecboothConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Loads configuration from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&get_config_path()?)
    }

    /// Saves configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Path to the config file, creating the directory when needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    let config_path = home.join(".config").join("recbooth").join("recbooth.toml");
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: RecboothConfig = toml::from_str("").unwrap();
        assert_eq!(config, RecboothConfig::default());
        assert_eq!(config.server.url, "http://127.0.0.1:5000");
        assert_eq!(config.audio.quality, QualityTier::High);
        assert_eq!(config.audio.peak_level_threshold, 85);
        assert_eq!(config.audio.chunk_interval_ms, 100);
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let config: RecboothConfig = toml::from_str(
            r#"
            [audio]
            quality = "low"
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.quality, QualityTier::Low);
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.server.request_timeout_secs, 30);
    }

    #[test]
    fn test_version_stamp_is_tolerated() {
        let config: RecboothConfig = toml::from_str(
            r#"
            config_version = "0.2.0"

            [server]
            url = "http://studio.local:5000"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.url, "http://studio.local:5000");
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recbooth.toml");

        let mut config = RecboothConfig::default();
        config.server.url = "http://10.0.0.7:5000".to_string();
        config.audio.quality = QualityTier::Medium;
        config.audio.chunk_interval_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = RecboothConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RecboothConfig::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
