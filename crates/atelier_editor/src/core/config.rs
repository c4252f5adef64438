//! Editor configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `atelier.toml` in the working directory
//! 3. The file named by `ATELIER_CONFIG`, or an explicit path
//! 4. `ATELIER_HISTORY_LIMIT` / `ATELIER_CACHE_CAPACITY`

use std::path::{Path, PathBuf};

use atelier_asset::CacheConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::history::Commander;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "ATELIER_CONFIG";
/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "atelier.toml";

const HISTORY_LIMIT_ENV: &str = "ATELIER_HISTORY_LIMIT";
const CACHE_CAPACITY_ENV: &str = "ATELIER_CACHE_CAPACITY";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undoable commands
    pub history_limit: usize,
    /// Root directory models and scenes are read from
    pub asset_root: PathBuf,
    /// `env_logger` filter used by the binary
    pub log_filter: String,
    /// Streaming model cache
    pub cache: CacheConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: Commander::DEFAULT_MAX_SIZE,
            asset_root: PathBuf::from("assets"),
            log_filter: "info".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read a config file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from all sources.
    ///
    /// An explicit path, or one named by `ATELIER_CONFIG`, must exist.
    /// `atelier.toml` is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match named {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                log::info!("Loaded config from {}", path.display());
                config
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                let config = Self::load_from_file(DEFAULT_CONFIG_FILE)?;
                log::info!("Loaded config from {}", DEFAULT_CONFIG_FILE);
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `ATELIER_HISTORY_LIMIT` and `ATELIER_CACHE_CAPACITY`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(HISTORY_LIMIT_ENV) {
            match value.trim().parse() {
                Ok(limit) => {
                    self.history_limit = limit;
                    log::info!("History limit from env: {}", limit);
                }
                Err(_) => log::warn!("Ignoring {}={:?}", HISTORY_LIMIT_ENV, value),
            }
        }

        if let Some(value) = lookup(CACHE_CAPACITY_ENV) {
            match value.trim().parse() {
                Ok(capacity) => {
                    self.cache.capacity = capacity;
                    log::info!("Cache capacity from env: {}", capacity);
                }
                Err(_) => log::warn!("Ignoring {}={:?}", CACHE_CAPACITY_ENV, value),
            }
        }
    }

    /// Write the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
