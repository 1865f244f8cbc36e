//! Configuration management for Purgo.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a partial file is fine.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Purgo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool settings
    pub processing: ProcessingConfig,

    /// Admission queue settings
    pub pipeline: PipelineConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Duplicate detection
    pub dedup: DedupConfig,

    /// Stripping engine policy
    pub strip: StripConfig,

    /// Export and staging settings
    pub export: ExportConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/rs.purgo.purgo/config.toml
    /// - Linux: ~/.config/purgo/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\purgo\purgo\config\config.toml
    ///
    /// Falls back to ~/.purgo/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("rs", "purgo", "purgo")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".purgo").join("config.toml")
            })
    }

    /// Resolved staging root for outbound transfers (with ~ expansion).
    ///
    /// `None` means the system temporary directory.
    pub fn staging_dir(&self) -> Option<PathBuf> {
        let raw = self.export.staging_dir.trim();
        if raw.is_empty() {
            return None;
        }
        let expanded = shellexpand::tilde(raw);
        Some(PathBuf::from(expanded.into_owned()))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
