//! Runtime configuration.
//!
//! Defaults, overlaid by an optional JSON file, overlaid by the
//! `SENGOKU_DATA_DIR` environment variable. The CLI applies its own flags
//! last.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sengoku_engine::config::GameRules;

pub const DATA_DIR_ENV: &str = "SENGOKU_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    /// Newest operation records kept.
    pub operation_log_capacity: usize,
    /// Newest snapshots kept on disk.
    pub snapshot_capacity: usize,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Admin code written into a freshly created world.
    pub admin_code: String,
    /// Seed for investment dice; entropy when absent.
    pub dice_seed: Option<u64>,
    pub rules: GameRules,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            operation_log_capacity: 100,
            snapshot_capacity: 20,
            log_filter: "info".to_string(),
            admin_code: "admin".to_string(),
            dice_seed: None,
            rules: GameRules::default(),
        }
    }
}

impl RuntimeConfig {
    /// Read a config file; keys it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults or `path`, then the environment override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}
