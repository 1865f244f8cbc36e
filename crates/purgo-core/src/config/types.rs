//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of strip workers running concurrently
    pub parallel_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
        }
    }
}

/// Admission queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max admitted items waiting for a worker
    pub buffer_size: usize,

    /// Capacity of the store and error event channels
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64,
            event_capacity: 256,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum payload size in megabytes
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 200,
        }
    }
}

impl LimitsConfig {
    pub fn max_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// How two admissions are judged to be the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Filename plus byte count
    NameAndSize,
    /// Filename, byte count and a BLAKE3 digest of the payload
    NameAndContent,
}

/// Duplicate detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub strategy: DedupStrategy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            strategy: DedupStrategy::NameAndContent,
        }
    }
}

/// Stripping engine policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Keep embedded ICC colour profiles. They affect rendering, not identity.
    pub retain_icc_profile: bool,

    /// Decode source and output and compare pixel buffers before accepting
    pub verify_pixels: bool,

    /// Deliver non-image payloads untouched instead of failing them
    pub passthrough_unsupported: bool,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            retain_icc_profile: true,
            verify_pixels: true,
            passthrough_unsupported: true,
        }
    }
}

/// Export and staging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    /// Root for outbound transfer staging; empty uses the system temp dir
    pub staging_dir: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
