// Ledger configuration

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use crate::consensus::Difficulty;
use crate::error::ConfigError;

/// Settings for a ledger instance
///
/// Every field is optional in the TOML file:
///
/// ```toml
/// difficulty = 16
/// cancel_check_interval = 1024
/// data_dir = "./data"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Required leading zero bits of a block hash
    pub difficulty: Difficulty,
    /// Nonce attempts between two checks of the cancel flag
    pub cancel_check_interval: u64,
    pub data_dir: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::DEFAULT,
            cancel_check_interval: 1024,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl LedgerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cancel_check_interval == 0 {
            return Err(ConfigError::InvalidCancelInterval);
        }
        Ok(())
    }
}
