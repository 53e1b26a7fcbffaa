//! CLI settings, read from `taskflow.toml` in the data directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taskflow_core::StoreConfig;
use taskflow_remote::MockRemoteConfig;

pub const SETTINGS_FILE: &str = "taskflow.toml";

/// Overrides every simulated remote latency, in milliseconds.
pub const LATENCY_ENV: &str = "TASKFLOW_LATENCY_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub remote: MockRemoteConfig,
    /// Log file, relative to the data directory unless absolute.
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Read settings from `data_dir`, falling back to defaults when the file
    /// does not exist, then apply environment overrides.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let mut settings = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content)
                .with_context(|| format!("Invalid settings in {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        settings.override_latency(std::env::var(LATENCY_ENV).ok().as_deref())?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.store.validate()?;
        Ok(settings)
    }

    fn override_latency(&mut self, raw: Option<&str>) -> Result<()> {
        let Some(raw) = raw else {
            return Ok(());
        };
        let ms: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be milliseconds, got '{}'", LATENCY_ENV, raw))?;
        self.remote.list_latency_ms = ms;
        self.remote.mutation_latency_ms = ms;
        self.remote.auth_latency_ms = ms;
        Ok(())
    }
}

/// `<platform data dir>/taskflow`.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("taskflow"))
        .context("No data directory on this platform, pass --data-dir")
}
