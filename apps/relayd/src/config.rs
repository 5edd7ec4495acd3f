//! Daemon configuration.
//!
//! Read from `$XDG_CONFIG_HOME/relaydrop/config.json` (falling back to
//! `~/.config`), or from the file named by `RELAYDROP_CONFIG`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relaydrop_queue::RelaySettings;
use serde::{Deserialize, Serialize};

/// Local directory destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub root: PathBuf,
    /// 0 = unlimited.
    #[serde(default)]
    pub quota_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub staging_dir: PathBuf,
    pub upload_chunk_bytes: usize,
    pub download_chunk_bytes: usize,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub engine_label: String,
    /// Submissions are refused until this is set.
    pub destination: Option<DestinationConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let settings = RelaySettings::default();
        Self {
            staging_dir: settings.staging_dir,
            upload_chunk_bytes: settings.upload_chunk_size,
            download_chunk_bytes: settings.download_chunk_size,
            poll_interval_ms: settings.poll_interval.as_millis() as u64,
            http_timeout_secs: settings.http_timeout.as_secs(),
            engine_label: settings.engine_label,
            destination: None,
        }
    }
}

impl RelayConfig {
    /// Loads the config file, falling back to defaults if it is missing or
    /// unparsable.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<RelayConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Library settings derived from this config. Zero values keep defaults.
    pub fn settings(&self) -> RelaySettings {
        let defaults = RelaySettings::default();
        RelaySettings {
            staging_dir: self.staging_dir.clone(),
            upload_chunk_size: nonzero_or(self.upload_chunk_bytes, defaults.upload_chunk_size),
            download_chunk_size: nonzero_or(
                self.download_chunk_bytes,
                defaults.download_chunk_size,
            ),
            poll_interval: if self.poll_interval_ms == 0 {
                defaults.poll_interval
            } else {
                Duration::from_millis(self.poll_interval_ms)
            },
            http_timeout: if self.http_timeout_secs == 0 {
                defaults.http_timeout
            } else {
                Duration::from_secs(self.http_timeout_secs)
            },
            engine_label: self.engine_label.clone(),
        }
    }
}

fn nonzero_or(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}

/// Config file location.
pub fn config_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("RELAYDROP_CONFIG") {
        return PathBuf::from(explicit);
    }
    config_base_dir().join("relaydrop").join("config.json")
}

fn config_base_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config")
}
