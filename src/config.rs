//! Service configuration stored as TOML in the app directory.
//!
//! A missing file yields defaults. `CHURN_MODEL_PATH` overrides the configured artifact path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};

/// Default filename used to store the service configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable overriding [`ServeConfig::model_path`].
pub const MODEL_PATH_ENV: &str = "CHURN_MODEL_PATH";
/// Artifact location used when nothing else is configured.
pub const DEFAULT_MODEL_PATH: &str = "models/model.json";

/// Errors that may occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to resolve the app directory.
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    /// Failed to create the config directory.
    #[error("Unable to create config directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read the config file.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write the config file.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {}: {source}", path.display())]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {}: {source}", path.display())]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
}

/// Top-level service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Location of the scoring artifact.
    pub model_path: PathBuf,
    pub logging: LoggingSettings,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Also write a per-launch log file in the app logs directory.
    pub file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

impl ServeConfig {
    /// Apply environment overrides using the provided lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(MODEL_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            self.model_path = PathBuf::from(path.trim());
        }
    }

    fn normalized(mut self) -> Self {
        let level = self.logging.level.trim();
        self.logging.level = if level.is_empty() {
            LoggingSettings::default().level
        } else {
            level.to_string()
        };
        if self.model_path.as_os_str().is_empty() {
            self.model_path = PathBuf::from(DEFAULT_MODEL_PATH);
        }
        self
    }
}

/// Resolve the configuration file path inside the app directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from the app directory and apply environment overrides.
pub fn load_or_default() -> Result<ServeConfig, ConfigError> {
    let mut config = load_from_path(&config_path()?)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from a specific file, returning defaults if it does not exist.
pub fn load_from_path(path: &Path) -> Result<ServeConfig, ConfigError> {
    if !path.exists() {
        return Ok(ServeConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<ServeConfig>(&text)
        .map(ServeConfig::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &ServeConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
