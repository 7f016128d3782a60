use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Environment variable holding the remote table store URL
pub const REMOTE_URL_ENV: &str = "DAYBOOK_REMOTE_URL";
/// Environment variable holding the remote table store API key
pub const REMOTE_KEY_ENV: &str = "DAYBOOK_REMOTE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Quiet period before a text edit is persisted
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub remote: Option<RemoteSettings>,
}

/// Connection details for the hosted table store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub url: String,
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            debounce_ms: default_debounce_ms(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
            remote: None,
        }
    }
}

fn default_database_path() -> String {
    // Fallback only; the profile decides the real path at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("daybook.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/daybook/daybook.db".to_string()
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Config version {0} is newer than this build supports ({CURRENT_CONFIG_VERSION})")]
    UnsupportedVersion(u32),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and database paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let mut config = Self::load_from_path(&config_path)?;
            // Keep dev and prod data apart even if the file was edited by hand
            config.database_path = Self::default_database_path_for_profile(profile);
            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            config.save_to_path(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file; missing fields take defaults
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        match config.config_version {
            Some(version) if version > CURRENT_CONFIG_VERSION => {
                Err(ConfigError::UnsupportedVersion(version))
            }
            _ => Ok(config),
        }
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("daybook.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/daybook-dev/daybook.db".to_string(),
                utils::Profile::Prod => "~/.local/share/daybook/daybook.db".to_string(),
            }
        }
    }

    /// Quiet period before a text edit is persisted
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Apply `DAYBOOK_REMOTE_URL` / `DAYBOOK_REMOTE_KEY` from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_remote_overrides(
            std::env::var(REMOTE_URL_ENV).ok(),
            std::env::var(REMOTE_KEY_ENV).ok(),
        )
    }

    /// Override remote settings field by field. Blank values are ignored.
    pub fn with_remote_overrides(mut self, url: Option<String>, api_key: Option<String>) -> Self {
        let url = url.filter(|v| !v.trim().is_empty());
        let api_key = api_key.filter(|v| !v.trim().is_empty());
        if url.is_none() && api_key.is_none() {
            return self;
        }

        let current = self.remote.take().unwrap_or(RemoteSettings {
            url: String::new(),
            api_key: String::new(),
        });
        self.remote = Some(RemoteSettings {
            url: url.unwrap_or(current.url),
            api_key: api_key.unwrap_or(current.api_key),
        });
        self
    }

    /// Remote settings when both url and key are present
    pub fn remote_settings(&self) -> Option<&RemoteSettings> {
        self.remote
            .as_ref()
            .filter(|r| !r.url.trim().is_empty() && !r.api_key.trim().is_empty())
    }
}
