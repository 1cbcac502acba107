use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::types::Config;

/// Upper bound on `demo.initial_items`.
pub const MAX_INITIAL_ITEMS: usize = 10_000;

/// Why a config file could not be turned into a usable [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in config '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {message}")]
    ValidationError { message: String },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}

impl Config {
    /// `flux-store/config.toml` under the platform config directory, or under
    /// the working directory when the platform has none.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flux-store")
            .join("config.toml")
    }

    /// Config from [`Config::config_path`]. No file there means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Config::default())
        }
    }

    /// Config from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// The logging filter must parse as an `EnvFilter` directive, and the demo
    /// store may start with at most [`MAX_INITIAL_ITEMS`] items.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let filter = &self.logging.filter;
        if filter.trim().is_empty() {
            return Err(invalid("logging.filter must not be empty"));
        }
        EnvFilter::try_new(filter)
            .map_err(|e| invalid(format!("logging.filter '{filter}' does not parse: {e}")))?;

        let items = self.demo.initial_items.len();
        if items > MAX_INITIAL_ITEMS {
            return Err(invalid(format!(
                "demo.initial_items has {items} entries, at most {MAX_INITIAL_ITEMS} allowed"
            )));
        }

        Ok(())
    }
}
