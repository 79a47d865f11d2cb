//! First-run setup.
//!
//! Creates the configuration file before the first recording (and again
//! after upgrades), asking for the studio server URL and a default quality
//! tier. The written file carries a `config_version` stamp so upgrades can
//! re-run the flow.

use std::fs;
use std::path::Path;

use anyhow::anyhow;
use cliclack::{input, intro, outro, select};
use console::style;
use regex::Regex;

use crate::config::{get_config_path, RecboothConfig};
use crate::quality::QualityTier;

/// Current application version from Cargo.toml
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Why setup should (or should not) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupNeed {
    /// No config file exists yet.
    FirstRun,
    /// The config predates this binary, or its stamp is unreadable.
    Upgrade { from: String },
    UpToDate,
}

/// Decides whether setup should run for the config at `path`.
///
/// # Errors
/// Returns an error if an existing config file cannot be read.
pub fn check_setup_needed(path: &Path) -> anyhow::Result<SetupNeed> {
    if !path.exists() {
        return Ok(SetupNeed::FirstRun);
    }
    let content = fs::read_to_string(path)?;
    let Some(stored) = extract_config_version(&content) else {
        return Ok(SetupNeed::Upgrade {
            from: "unstamped".to_string(),
        });
    };
    let current = parse_version(CURRENT_VERSION)
        .ok_or_else(|| anyhow!("Invalid package version {CURRENT_VERSION}"))?;
    match parse_version(&stored) {
        Some(found) if found >= current => Ok(SetupNeed::UpToDate),
        _ => Ok(SetupNeed::Upgrade { from: stored }),
    }
}

/// Runs the interactive setup and writes the stamped config file. Existing
/// settings become the prompt defaults, so re-running is non-destructive.
///
/// # Errors
/// Returns an error when a prompt is cancelled or the file cannot be
/// written.
pub fn run_setup() -> anyhow::Result<()> {
    let mut config = RecboothConfig::load().unwrap_or_default();

    println!("\n ┏┓┏┓┏┓ \n ┛ ┗┛┗┛ \n");
    intro(style(" setup ").on_white().black())?;

    let url: String = input("Studio server URL")
        .default_input(&config.server.url)
        .validate(|value: &String| {
            if value.starts_with("http://") || value.starts_with("https://") {
                Ok(())
            } else {
                Err("Enter a full URL, like http://127.0.0.1:5000")
            }
        })
        .interact()?;

    let quality: QualityTier = select("Default recording quality")
        .item(QualityTier::High, "high", "48 kHz stereo, 24-bit")
        .item(QualityTier::Medium, "medium", "44.1 kHz stereo, 16-bit")
        .item(QualityTier::Low, "low", "22.05 kHz mono, 16-bit")
        .initial_value(config.audio.quality)
        .interact()?;

    config.server.url = url.trim_end_matches('/').to_string();
    config.audio.quality = quality;
    config.save()?;

    let config_path = get_config_path()?;
    stamp_config_version(&config_path)?;
    tracing::info!("Setup complete, config written to {:?}", config_path);

    outro(format!("Ready. Config file: {}", config_path.display()))?;
    Ok(())
}

/// Writes the current version stamp into the config file, replacing any
/// existing stamp line.
///
/// # Errors
/// Returns an error if the file cannot be read or written.
pub fn stamp_config_version(path: &Path) -> anyhow::Result<()> {
    let content = fs::read_to_string(path)?;
    let stamp = format!("config_version = \"{CURRENT_VERSION}\"");
    let updated = if extract_config_version(&content).is_some() {
        version_line_pattern()
            .replace(&content, stamp.as_str())
            .into_owned()
    } else {
        format!("{stamp}\n\n{content}")
    };
    fs::write(path, updated)?;
    Ok(())
}

fn version_line_pattern() -> Regex {
    // Any failure here would be a typo in the literal below.
    Regex::new(r#"(?m)^\s*config_version\s*=\s*"([^"]+)""#).expect("version line pattern")
}

fn extract_config_version(content: &str) -> Option<String> {
    version_line_pattern()
        .captures(content)
        .map(|caps| caps[1].to_string())
}

/// Parses "major.minor.patch" into a comparable triple.
fn parse_version(text: &str) -> Option<(u32, u32, u32)> {
    let mut parts = text.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_triples() {
        assert_eq!(parse_version("1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version(" 0.2.0 "), Some((0, 2, 0)));
        assert_eq!(parse_version("1.2"), None);
        assert_eq!(parse_version("1.2.x"), None);
        assert_eq!(parse_version(""), None);
    }

    #[test]
    fn test_version_triples_order() {
        assert!(parse_version("0.2.0") > parse_version("0.1.9"));
        assert!(parse_version("1.0.0") > parse_version("0.9.9"));
        assert!(parse_version("0.2.0") == parse_version("0.2.0"));
    }

    #[test]
    fn test_extract_config_version() {
        assert_eq!(
            extract_config_version("config_version = \"0.1.0\"\n[server]\n"),
            Some("0.1.0".to_string())
        );
        assert_eq!(
            extract_config_version("  config_version   =   \"2.0.1\"  "),
            Some("2.0.1".to_string())
        );
        assert_eq!(extract_config_version("[server]\nurl = \"x\"\n"), None);
    }

    #[test]
    fn test_setup_needed_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let need = check_setup_needed(&dir.path().join("recbooth.toml")).unwrap();
        assert_eq!(need, SetupNeed::FirstRun);
    }

    #[test]
    fn test_setup_needed_for_old_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recbooth.toml");
        fs::write(&path, "config_version = \"0.0.1\"\n[server]\n").unwrap();
        assert_eq!(
            check_setup_needed(&path).unwrap(),
            SetupNeed::Upgrade {
                from: "0.0.1".to_string()
            }
        );
    }

    #[test]
    fn test_setup_needed_for_unstamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recbooth.toml");
        fs::write(&path, "[server]\nurl = \"http://x\"\n").unwrap();
        assert!(matches!(
            check_setup_needed(&path).unwrap(),
            SetupNeed::Upgrade { .. }
        ));
    }

    #[test]
    fn test_setup_not_needed_when_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recbooth.toml");
        fs::write(
            &path,
            format!("config_version = \"{CURRENT_VERSION}\"\n[server]\n"),
        )
        .unwrap();
        assert_eq!(check_setup_needed(&path).unwrap(), SetupNeed::UpToDate);
    }

    #[test]
    fn test_stamp_prepends_once_then_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recbooth.toml");
        fs::write(&path, "[server]\nurl = \"http://x\"\n").unwrap();

        stamp_config_version(&path).unwrap();
        let stamped = fs::read_to_string(&path).unwrap();
        assert!(stamped.starts_with(&format!("config_version = \"{CURRENT_VERSION}\"")));
        assert!(stamped.contains("url = \"http://x\""));

        // Stamping again replaces in place instead of stacking lines.
        stamp_config_version(&path).unwrap();
        let restamped = fs::read_to_string(&path).unwrap();
        assert_eq!(restamped.matches("config_version").count(), 1);
    }
}
