//! Core data types shared by the ingestion, stripping and export stages.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::ingest::Fingerprint;

/// Session-unique identifier of an admitted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Container formats the engine can rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Jpeg,
    Png,
    WebP,
}

impl ContainerFormat {
    /// Canonical lowercase name ("jpeg", "png", "webp").
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    /// Matching codec format for decoding with the `image` crate.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }

    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(Self::Jpeg),
            "png" | "apng" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller claims a payload is, usually derived from its filename.
///
/// Only used to classify undetectable payloads; detection always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatHint(Option<ContainerFormat>);

impl FormatHint {
    pub const NONE: Self = Self(None);

    pub fn from_filename(filename: &str) -> Self {
        let format = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ContainerFormat::from_extension);
        Self(format)
    }

    pub fn declared(self) -> Option<ContainerFormat> {
        self.0
    }
}

impl From<ContainerFormat> for FormatHint {
    fn from(format: ContainerFormat) -> Self {
        Self(Some(format))
    }
}

/// Category of an embedded metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Exif,
    Xmp,
    Iptc,
    Comment,
    Text,
    Timestamp,
    IccProfile,
    Thumbnail,
    Other(String),
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exif => f.write_str("EXIF"),
            Self::Xmp => f.write_str("XMP"),
            Self::Iptc => f.write_str("IPTC"),
            Self::Comment => f.write_str("comment"),
            Self::Text => f.write_str("text"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::IccProfile => f.write_str("ICC profile"),
            Self::Thumbnail => f.write_str("thumbnail"),
            Self::Other(label) => write!(f, "other ({label})"),
        }
    }
}

/// A metadata block found in (and, for strip reports, removed from) a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedBlock {
    pub kind: MetadataKind,
    /// Size of the block in bytes, including its container framing
    pub len: usize,
}

/// How the engine handled a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StripOutcome {
    /// Metadata was removed (the list may be empty for clean inputs)
    Stripped { removed: Vec<RemovedBlock> },
    /// Not a strippable container; delivered unchanged
    PassThrough,
}

impl StripOutcome {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }

    pub fn removed(&self) -> &[RemovedBlock] {
        match self {
            Self::Stripped { removed } => removed,
            Self::PassThrough => &[],
        }
    }
}

/// An admitted input. Immutable once created.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub id: ItemId,
    pub filename: String,
    pub payload: Bytes,
    pub fingerprint: Fingerprint,
}

/// A successfully sanitized item, the only entity collaborators read.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedItem {
    pub id: ItemId,
    /// Final path component of the submitted filename; used verbatim on export
    pub display_name: String,
    #[serde(skip)]
    pub sanitized_payload: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ContainerFormat>,
    pub outcome: StripOutcome,
}

impl ProcessedItem {
    pub fn len(&self) -> usize {
        self.sanitized_payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sanitized_payload.is_empty()
    }
}

/// Per-item lifecycle. Transitions only move forward.
#[derive(Debug, Clone)]
pub enum ProcessingState {
    Pending,
    InFlight,
    Completed(Arc<ProcessedItem>),
    Failed(ErrorKind),
}

impl ProcessingState {
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InFlight => 1,
            Self::Completed(_) | Self::Failed(_) => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_advance_to(&self, next: &ProcessingState) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Final result of a submission, as observed through its handle.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Completed(Arc<ProcessedItem>),
    Failed(ErrorKind),
    /// Rejected as a duplicate; nothing happened
    Ignored,
    /// Withdrawn before completion; the result was thrown away
    Discarded,
}

/// Mutations of the result store, in store order.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Added(Arc<ProcessedItem>),
    Removed(ItemId),
    Cleared,
}

/// A failure notification for the error channel.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    pub kind: ErrorKind,
    pub message: String,
}

/// Derive the name an item is shown and exported under.
///
/// Only the last path component survives, so a crafted filename cannot point
/// an export outside its destination directory.
pub fn display_name_for(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("untitled")
        .to_string()
}
