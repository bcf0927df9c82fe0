//! # Configuration
//!
//! JSON settings for the emulator host and its terminal console.
//!
//! ```json
//! {
//!   "binary": "demo.binary",
//!   "update_each_steps": 1024,
//!   "console": { "refresh_rate_ms": 50, "show_locks": false }
//! }
//! ```
//!
//! Every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmulatorConfig {
    /// Program image opened at startup.
    pub binary: Option<PathBuf>,
    /// Hub steps executed per run frame.
    pub update_each_steps: u32,
    pub console: ConsoleConfig,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            binary: None,
            update_each_steps: 1024,
            console: ConsoleConfig::default(),
        }
    }
}

impl EmulatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Console configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub refresh_rate_ms: u64,
    pub show_pins: bool,
    pub show_cogs: bool,
    pub show_locks: bool,
    pub show_memory: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 100,
            show_pins: true,
            show_cogs: true,
            show_locks: true,
            show_memory: true,
        }
    }
}
