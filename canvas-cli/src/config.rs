//! Application configuration storage
//!
//! Handles persistent storage of the chat service connection and the
//! default canvas snapshot location.

use std::path::{Path, PathBuf};

use chat_stream::StreamClientConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::constants::{env, paths};

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Chat service connection
    #[serde(default)]
    pub server: StreamClientConfig,
    /// Project the canvas belongs to; generated on first chat when missing
    #[serde(default)]
    pub project_id: Option<Uuid>,
    /// Snapshot file used when `--snapshot` is not given
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl AppConfig {
    /// Default directory for config and snapshot files
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR))
    }

    /// Load configuration from disk
    pub async fn load(app_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = app_dir.join(paths::CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, app_dir: &Path) -> Result<(), ConfigError> {
        // Ensure directory exists
        fs::create_dir_all(app_dir).await?;

        let config_path = app_dir.join(paths::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// The configured project id, creating and remembering one when missing.
    ///
    /// A new id is written into the config file as it is on disk, so env
    /// overrides never reach it. A config file that fails to load is left
    /// untouched.
    pub async fn ensure_project_id(&mut self, app_dir: &Path) -> Uuid {
        if let Some(id) = self.project_id {
            return id;
        }
        let id = Uuid::new_v4();
        self.project_id = Some(id);
        log::info!("Created project {}", id);

        match Self::load(app_dir).await {
            Ok(mut on_disk) => {
                on_disk.project_id = Some(id);
                if let Err(e) = on_disk.save(app_dir).await {
                    log::warn!("Failed to remember project id: {}", e);
                }
            }
            Err(e) => log::warn!("Not remembering project id, config did not load: {}", e),
        }
        id
    }

    /// Apply overrides from the environment
    pub fn apply_env(&mut self) {
        self.apply_token_override(std::env::var(env::API_TOKEN).ok());
    }

    fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            log::debug!("Using API token from {}", env::API_TOKEN);
            self.server.api_token = Some(token);
        }
    }

    /// Snapshot file to use, preferring an explicit path
    pub fn resolve_snapshot_path(&self, explicit: Option<PathBuf>, app_dir: &Path) -> PathBuf {
        explicit
            .or_else(|| self.snapshot_path.clone())
            .unwrap_or_else(|| app_dir.join(paths::SNAPSHOT_FILE))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
