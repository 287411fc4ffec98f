//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/freebusy/config.toml` by default:
//!
//! ```toml
//! [expansion]
//! candidates = "skip_one"   # or "skip_rest"
//! count = "exact"           # or "inclusive"
//!
//! [window]
//! days = 30
//!
//! [output]
//! json = false
//! ```

use std::path::{Path, PathBuf};

use freebusy_core::ExpandOptions;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the freebusy client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Expansion policies.
    pub expansion: ExpandOptions,

    /// Default query window.
    pub window: WindowSettings,

    /// Output settings.
    pub output: OutputSettings,
}

/// Default query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Days covered when neither `--to` nor `--days` is given.
    pub days: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self { days: 30 }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Print JSON instead of text.
    pub json: bool,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults when the file
    /// does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))
    }

    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> ClientResult<()> {
        if self.window.days == 0 {
            return Err(ClientError::Config(
                "window.days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("freebusy")
    }
}
