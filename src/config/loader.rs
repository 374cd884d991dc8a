use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::ReactorConfig;

/// Environment variable naming an explicit reactor config file.
pub const CONFIG_ENV: &str = "FLOWREACTOR_CONFIG";

/// Why a reactor config could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read reactor config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in reactor config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("reactor config field `{field}` {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ReactorConfig {
    /// Path of the reactor config file.
    ///
    /// `FLOWREACTOR_CONFIG` wins when set and non-empty. Otherwise
    /// `flowreactor/config.toml` under `dirs::config_dir()`, or under the
    /// current directory when there is none.
    pub fn config_path() -> PathBuf {
        resolve_path(std::env::var_os(CONFIG_ENV))
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `ReactorConfig::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(ReactorConfig::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: ReactorConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Both capacities must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingress_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "ingress_capacity",
                reason: "must be at least 1",
            });
        }

        if self.subscriber_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "subscriber_capacity",
                reason: "must be at least 1",
            });
        }

        Ok(())
    }
}

fn resolve_path(explicit: Option<OsString>) -> PathBuf {
    match explicit {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowreactor")
            .join("config.toml"),
    }
}
