//! Persistent command line configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mailbox_core::SmtpConfig;
use mailbox_core::email::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};

/// Settings read from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Location of the `SQLite` database.
    pub database_path: PathBuf,
    /// Entries per listing page.
    pub page_size: u32,
    /// Outbound relay.
    pub smtp: SmtpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailbox")
                .join("mailbox.db"),
            page_size: DEFAULT_PAGE_SIZE,
            smtp: SmtpConfig::default(),
        }
    }
}

/// Default location of the configuration file.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailbox")
        .join("config.json")
}

impl Config {
    /// Loads the configuration, falling back to defaults when the file is missing.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Writes the configuration as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        tracing::info!("Config saved to {:?}", path);
        Ok(())
    }
}
