//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the login endpoint, request timeout, the storage backend
//! for the session and the last email used to log in.
//!
//! Configuration is stored at `~/.config/dashgate/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyringStorage, MemoryStorage, Storage};

/// Application name used for config/data directory paths
const APP_NAME: &str = "dashgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default login endpoint for a locally running dashboard API
const DEFAULT_LOGIN_URL: &str = "http://localhost:8000/api/auth/login";

/// Login request timeout in seconds.
/// One attempt, no retries: the caller decides whether to try again.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Where the session token and profile are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub login_url: String,
    pub request_timeout_secs: u64,
    pub storage: StorageBackend,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage: StorageBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory used by the file storage backend.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the configured storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn Storage>> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStorage::new(self.storage_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        })
    }
}
