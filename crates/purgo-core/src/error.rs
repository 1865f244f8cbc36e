//! Error types for the Purgo stripping and export pipeline.
//!
//! Errors are organized by stage. Every stage error can be collapsed into an
//! [`ErrorKind`], the small serializable taxonomy that travels through the
//! error notification channel and item outcomes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ContainerFormat, ItemId};

/// Coarse failure categories surfaced to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Container not recognized or not supported
    UnsupportedFormat,
    /// Payload failed to decode
    CorruptSource,
    /// Re-encoding produced an invalid or non-equivalent container
    EncodeFailure,
    /// Filesystem read/write failed during staging or export
    IoFailure,
    /// Export target cannot be written
    DestinationConflict,
    /// Payload exceeds the configured size limit
    TooLarge,
    /// No completed item with the requested id
    UnknownItem,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::UnsupportedFormat => "unsupported format",
            Self::CorruptSource => "corrupt source",
            Self::EncodeFailure => "encode failure",
            Self::IoFailure => "I/O failure",
            Self::DestinationConflict => "destination conflict",
            Self::TooLarge => "too large",
            Self::UnknownItem => "unknown item",
        };
        f.write_str(label)
    }
}

/// Top-level error type for Purgo operations.
#[derive(Error, Debug)]
pub enum PurgoError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metadata stripping errors
    #[error("Strip error: {0}")]
    Strip(#[from] StripError),

    /// Export and staging errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the metadata stripping engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StripError {
    /// An image the engine cannot rewrite (GIF, TIFF, BMP, ...)
    #[error("Unsupported format: {detail}")]
    UnsupportedFormat { detail: String },

    /// Payload carries no image signature at all
    #[error("Not an image: {detail}")]
    NotAnImage { detail: String },

    /// Container structure or pixel data could not be decoded
    #[error("Corrupt {format} source: {message}")]
    CorruptSource {
        format: ContainerFormat,
        message: String,
    },

    /// The rewritten container failed verification
    #[error("Re-encoding {format} failed: {message}")]
    EncodeFailure {
        format: ContainerFormat,
        message: String,
    },

    /// Payload exceeds the admission limit
    #[error("Payload too large ({size_mb}MB > {max_mb}MB)")]
    TooLarge { size_mb: u64, max_mb: u64 },
}

impl StripError {
    pub(crate) fn corrupt(format: ContainerFormat, message: impl Into<String>) -> Self {
        Self::CorruptSource {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn encode(format: ContainerFormat, message: impl Into<String>) -> Self {
        Self::EncodeFailure {
            format,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } | Self::NotAnImage { .. } => {
                ErrorKind::UnsupportedFormat
            }
            Self::CorruptSource { .. } => ErrorKind::CorruptSource,
            Self::EncodeFailure { .. } => ErrorKind::EncodeFailure,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
        }
    }
}

/// Errors raised while exporting or staging sanitized payloads.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The requested item is not in the result store
    #[error("No completed item {0}")]
    UnknownItem(ItemId),

    /// The destination exists but cannot be replaced or written into
    #[error("Cannot write to {path}: {message}")]
    DestinationConflict { path: PathBuf, message: String },

    /// Filesystem failure while writing
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Classify an I/O error raised while writing `path`.
    ///
    /// Permission and "is a directory" style failures mean the target itself
    /// is unusable; everything else is treated as a transient I/O failure.
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let path = path.into();
        match source.kind() {
            Io::PermissionDenied | Io::AlreadyExists | Io::IsADirectory | Io::NotADirectory => {
                Self::DestinationConflict {
                    path,
                    message: source.to_string(),
                }
            }
            _ => Self::Io { path, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownItem(_) => ErrorKind::UnknownItem,
            Self::DestinationConflict { .. } => ErrorKind::DestinationConflict,
            Self::Io { .. } => ErrorKind::IoFailure,
        }
    }
}

/// Convenience type alias for Purgo results.
pub type Result<T> = std::result::Result<T, PurgoError>;

/// Convenience type alias for engine results.
pub type StripResult<T> = std::result::Result<T, StripError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_error_kinds() {
        let err = StripError::corrupt(ContainerFormat::Jpeg, "truncated");
        assert_eq!(err.kind(), ErrorKind::CorruptSource);
        assert!(err.to_string().contains("truncated"));

        let err = StripError::TooLarge {
            size_mb: 300,
            max_mb: 200,
        };
        assert_eq!(err.kind(), ErrorKind::TooLarge);
    }

    #[test]
    fn test_export_error_classifies_permission_as_conflict() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ExportError::from_io("/out/a.jpg", io);
        assert_eq!(err.kind(), ErrorKind::DestinationConflict);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = ExportError::from_io("/out/a.jpg", io);
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DestinationConflict).unwrap();
        assert_eq!(json, "\"destination_conflict\"");
    }
}
