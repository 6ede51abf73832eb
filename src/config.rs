//! Configuration management for Tile Fetcher
//!
//! Settings are layered: built-in defaults, then a TOML file (the user's
//! config directory or `--config`), then environment variables, then CLI
//! flags, which the command layer applies last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::ClientConfig;
use crate::constants::{disk, env as env_constants, files, logging, selection};
use crate::errors::{ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog HTTP client settings
    pub catalog: ClientConfig,
    /// Cache, ledger and disk policy
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where downloads and state files live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Download cache directory (default `~/.tile-diff/cache`)
    pub cache_dir: Option<PathBuf>,
    /// EULA ledger path (default `<cache_dir>/eula_acceptance.json`)
    pub eula_file: Option<PathBuf>,
    /// Free space to keep beyond the file itself, in GiB
    pub min_free_space_gb: u64,
    /// File suggested first when a release publishes several
    pub recommended_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            eula_file: None,
            min_free_space_gb: disk::DEFAULT_MIN_FREE_SPACE_GB,
            recommended_file: selection::RECOMMENDED_FILE_NAME.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load defaults overlaid with the config file and the environment
    ///
    /// An explicit `config_file_override` must exist; the default location
    /// is optional.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Self::load_from_file(&path).await?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_from_file(&path).await?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join(files::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Overlay path overrides from the environment
    ///
    /// Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_empty(env_constants::CACHE_DIR) {
            debug!("Cache directory from {}: {}", env_constants::CACHE_DIR, dir);
            self.storage.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(file) = non_empty(env_constants::EULA_FILE) {
            debug!("EULA ledger from {}: {}", env_constants::EULA_FILE, file);
            self.storage.eula_file = Some(PathBuf::from(file));
        }
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.catalog.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "catalog.host".to_string(),
                value: self.catalog.host.clone(),
                reason: "Host must not be empty".to_string(),
            }
            .into());
        }
        if self.catalog.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "catalog.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Rate limit must be at least 1 request per second".to_string(),
            }
            .into());
        }
        if self.storage.recommended_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.recommended_file".to_string(),
                value: String::new(),
                reason: "Recommended file name must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Effective cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.storage.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
                Ok(home.join(files::HOME_APP_DIR).join(files::CACHE_SUBDIR))
            }
        }
    }

    /// Effective EULA ledger path
    pub fn eula_file(&self) -> Result<PathBuf> {
        match &self.storage.eula_file {
            Some(file) => Ok(file.clone()),
            None => Ok(self.cache_dir()?.join(files::EULA_FILE_NAME)),
        }
    }

    /// Cache manifest path
    pub fn manifest_file(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(files::MANIFEST_FILE_NAME))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::Serialize)?)
    }
}
