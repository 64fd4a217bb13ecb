use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::digest::ChecksumAlgorithm;

/// Transport settings (optional `[fetch]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Seconds allowed for connection setup.
    pub connect_timeout_secs: u64,
    /// Deadline in seconds for a whole transfer; omit for no deadline.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// If true, non-2xx responses fail the fetch instead of being hashed.
    #[serde(default)]
    pub reject_http_errors: bool,
    /// Proxy URL (e.g. `http://proxy:3128`); omit to connect directly.
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: Some(3600),
            reject_http_errors: false,
            proxy: None,
        }
    }
}

/// Global configuration loaded from `~/.config/canary/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryConfig {
    /// SQLite catalog path or `sqlite:` URL. None = `~/.local/state/canary/catalog.db`.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Table holding the catalog entries.
    pub collection: String,
    /// Maximum number of fetches in flight at once.
    pub max_concurrent_fetches: usize,
    /// Digest algorithm the stored checksums were produced with.
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            collection: "assets".to_string(),
            max_concurrent_fetches: 5,
            algorithm: ChecksumAlgorithm::Md5,
            fetch: FetchConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("canary")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CanaryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CanaryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CanaryConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
