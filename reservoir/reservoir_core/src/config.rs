//! Pool configuration.
//!
//! Configuration can be built in code, or loaded from JSON or TOML. Every loader
//! validates the result before returning it.

use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default per-key idle capacity.
pub const DEFAULT_MAX_SIZE: usize = 10;

fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

/// Configuration for a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of idle resources kept per key
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given per-key capacity.
    pub fn with_max_size(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Check the configuration for invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::Invalid(
                "max_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// Files with a `.toml` extension are read as TOML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading pool configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        debug!("Loaded pool configuration: {:?}", config);
        Ok(config)
    }
}
