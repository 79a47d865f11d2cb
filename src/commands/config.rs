//! Configuration file editor command.
//!
//! Opens the recbooth configuration file in the user's preferred editor,
//! writing a default file first when none exists yet.

use std::process::Command;

use crate::config::{get_config_path, RecboothConfig};

const FALLBACK_EDITORS: [&str; 2] = ["nano", "vi"];

/// Opens the recbooth configuration file in an editor.
///
/// Editor resolution order: `$VISUAL`, `$EDITOR`, then the first of nano
/// and vi found on the PATH.
///
/// # Errors
/// - If the default configuration cannot be written
/// - If no editor can be found or the editor exits with a failure
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        tracing::info!("No config file yet, writing defaults first");
        RecboothConfig::default().save()?;
        println!("Created {} with default settings.", config_path.display());
    }

    let editor = pick_editor()
        .ok_or_else(|| anyhow::anyhow!("No editor found. Set $EDITOR and try again."))?;
    tracing::info!("Editing {} with {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| anyhow::anyhow!("Could not launch '{editor}': {e}"))?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "'{editor}' exited with status {}",
            status.code().unwrap_or(-1)
        ));
    }

    tracing::info!("Config file edited");
    Ok(())
}

fn pick_editor() -> Option<String> {
    for var in ["VISUAL", "EDITOR"] {
        match std::env::var(var) {
            Ok(editor) if !editor.trim().is_empty() => return Some(editor),
            _ => {}
        }
    }
    FALLBACK_EDITORS
        .iter()
        .find(|editor| on_path(editor))
        .map(|editor| editor.to_string())
}

fn on_path(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
