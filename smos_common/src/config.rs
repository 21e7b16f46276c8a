//! Configuration loading: a `ConfigLoader` trait with a default TOML-file
//! implementation, and the `StoreConfig` it loads.

use crate::consts::{DEFAULT_AUTHKEY, DEFAULT_PORT_MAX, DEFAULT_PORT_MIN};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found")]
    FileNotFound,

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Coordinator startup configuration: port range and authentication key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub port_min: u16,
    pub port_max: u16,
    pub authkey: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            port_min: DEFAULT_PORT_MIN,
            port_max: DEFAULT_PORT_MAX,
            authkey: DEFAULT_AUTHKEY.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port_min >= self.port_max {
            return Err(ConfigError::Validation(format!(
                "port_min ({}) must be less than port_max ({})",
                self.port_min, self.port_max
            )));
        }
        if self.authkey.is_empty() {
            return Err(ConfigError::Validation(
                "authkey cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads a TOML configuration file into any `Deserialize` type.
///
/// Returns [`ConfigError::FileNotFound`] if the path does not exist, so
/// callers can fall back to built-in defaults without treating a missing
/// file as fatal.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound);
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl ConfigLoader for StoreConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_port_range_rejected() {
        let config = StoreConfig {
            port_min: 100,
            port_max: 100,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = StoreConfig::load(Path::new("/nonexistent/smos.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound));
    }

    #[test]
    fn loads_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smos.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "port_min = 6000\nport_max = 6100\nauthkey = \"secret\"").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.port_min, 6000);
        assert_eq!(config.port_max, 6100);
        assert_eq!(config.authkey, "secret");
    }
}
