//! Structured logging for recbooth using the tracing crate.
//!
//! Writes to daily-rotated files under the XDG state directory and never to
//! the terminal, so the TUI stays clean. Old files are pruned at startup,
//! keeping the 7 most recent days.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

const LOG_PREFIX: &str = "recbooth.log";
const MAX_LOG_FILES: usize = 7;

/// Keeps the non-blocking appender alive for the program lifetime.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes file-based logging.
///
/// Log level comes from RUST_LOG and defaults to "info".
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = get_log_dir()?;

    if let Err(e) = cleanup_old_logs(&log_dir) {
        eprintln!("Warning: failed to clean up old logs: {e}");
    }

    let file_appender = rolling::daily(&log_dir, LOG_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log directory: {}", log_dir.display());
    Ok(())
}

/// Log directory, following the XDG Base Directory Specification.
///
/// Prefers XDG_STATE_HOME when set, otherwise ~/.local/state/recbooth.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the log directory cannot be created
pub fn get_log_dir() -> anyhow::Result<PathBuf> {
    let log_dir = if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        PathBuf::from(xdg_state).join("recbooth")
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        home.join(".local/state/recbooth")
    };

    fs::create_dir_all(&log_dir)?;

    Ok(log_dir)
}

/// Prunes rotated log files beyond the retention window.
///
/// Daily rotation names files `recbooth.log.YYYY-MM-DD`, which sorts
/// chronologically by name alone, so no metadata reads are needed.
///
/// # Errors
/// - If the log directory cannot be read
fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let mut rotated: Vec<String> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let name = entry.ok()?.file_name().to_string_lossy().to_string();
            let suffix = name.strip_prefix(&format!("{LOG_PREFIX}."))?;
            if looks_like_date(suffix) {
                Some(name)
            } else {
                None
            }
        })
        .collect();

    rotated.sort_unstable();
    let excess = rotated.len().saturating_sub(MAX_LOG_FILES);
    for name in rotated.into_iter().take(excess) {
        let path = log_dir.join(&name);
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }

    Ok(())
}

fn looks_like_date(suffix: &str) -> bool {
    let bytes = suffix.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && suffix
            .chars()
            .enumerate()
            .all(|(i, c)| matches!(i, 4 | 7) || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_suffix_detection() {
        assert!(looks_like_date("2025-08-26"));
        assert!(!looks_like_date("2025-8-26"));
        assert!(!looks_like_date("backup"));
        assert!(!looks_like_date("2025-08-26.old"));
    }

    #[test]
    fn test_cleanup_keeps_newest_seven() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=10 {
            let name = format!("{LOG_PREFIX}.2025-08-{day:02}");
            fs::write(dir.path().join(name), "log").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        cleanup_old_logs(dir.path()).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 8); // 7 logs plus the unrelated file
        assert!(!remaining.contains(&format!("{LOG_PREFIX}.2025-08-01")));
        assert!(remaining.contains(&format!("{LOG_PREFIX}.2025-08-10")));
        assert!(remaining.contains(&"unrelated.txt".to_string()));
    }
}
