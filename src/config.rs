//! Asset pipeline configuration

use crate::error::{AssetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default directory assets are fetched from
pub const DEFAULT_ASSET_ROOT: &str = "assets";

/// Runtime configuration for loaders and logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory that asset keys are resolved against
    pub root: PathBuf,
    /// `tracing` env-filter directive used by `profiling::init_tracing`
    pub log_filter: String,
    /// Write JSON logs to this file instead of stdout
    pub log_file: Option<PathBuf>,
}

impl AssetConfig {
    /// Create config with a custom asset root
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parse config from a JSON string. Missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AssetError::ConfigError(e.to_string()))
    }

    /// Read config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AssetError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ASSET_ROOT),
            log_filter: "info".to_string(),
            log_file: None,
        }
    }
}
