//! Logging init: append to a log file under the XDG state dir, else stderr.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,canary_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the log file: `~/.local/state/canary/canary.log`.
pub fn log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("canary")?;
    Ok(xdg_dirs.get_state_home().join("canary").join("canary.log"))
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Plain-text subscriber writing every event to `file`. Runs are short and
/// tasks log a handful of lines each, so one locked handle is enough.
fn file_subscriber(file: fs::File, filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish()
}

/// Initialize structured logging to `~/.local/state/canary/canary.log`.
/// Returns Err when the file cannot be opened so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let path = log_path()?;
    let file = open_log_file(&path)?;
    file_subscriber(file, env_filter())
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {}", e))?;
    tracing::info!("canary logging initialized at {}", path.display());
    Ok(())
}

/// Initialize logging to stderr only.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_created_with_parent_dirs_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("canary").join("canary.log");

        let first = open_log_file(&path).unwrap();
        tracing::subscriber::with_default(file_subscriber(first, EnvFilter::new("info")), || {
            tracing::info!(id = "e1", "checksum matched");
        });
        let second = open_log_file(&path).unwrap();
        tracing::subscriber::with_default(file_subscriber(second, EnvFilter::new("info")), || {
            tracing::debug!("filtered out");
            tracing::warn!(id = "e2", "fetch failed");
        });

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "log contents: {text}");
        assert!(lines[0].contains("checksum matched") && lines[0].contains("e1"));
        assert!(lines[1].contains("WARN") && lines[1].contains("fetch failed"));
        assert!(!text.contains("filtered out"));
        assert!(!text.contains('\u{1b}'), "no ANSI escapes in the file");
    }

    #[test]
    fn unwritable_log_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();
        let err = open_log_file(&blocker.join("canary.log")).unwrap_err();
        assert!(err.to_string().contains("create log dir"));
    }
}
