//! Read-only inventory of the metadata a payload carries.

use std::io::Cursor;

use exif::{In, Tag};
use serde::{Deserialize, Serialize};

use crate::error::StripResult;
use crate::types::{ContainerFormat, MetadataKind, RemovedBlock};

use super::{detect, parse_blocks, Disposition};

/// Metadata found in a payload before stripping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataInventory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ContainerFormat>,

    /// Every block the engine would remove (or keep as a colour profile)
    pub blocks: Vec<RemovedBlock>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifSummary>,
}

impl MetadataInventory {
    pub fn is_clean(&self) -> bool {
        self.blocks.iter().all(|b| b.kind == MetadataKind::IccProfile)
    }
}

/// The identity-revealing highlights of an EXIF block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExifSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,

    /// Any GPS tag is present
    pub has_gps: bool,

    pub field_count: usize,
}

/// List the metadata blocks in `data`.
///
/// Payloads that are not a supported container produce an empty inventory
/// with no format; structurally broken supported containers are an error.
pub fn inspect(data: &[u8]) -> StripResult<MetadataInventory> {
    let Some(format) = detect(data) else {
        return Ok(MetadataInventory {
            format: None,
            blocks: Vec::new(),
            exif: None,
        });
    };

    let blocks = parse_blocks(format, data)?
        .into_iter()
        .filter_map(|block| match block.disposition {
            Disposition::Keep => None,
            Disposition::ColorProfile => Some(RemovedBlock {
                kind: MetadataKind::IccProfile,
                len: block.raw.len(),
            }),
            Disposition::Drop(kind) => Some(RemovedBlock {
                kind,
                len: block.raw.len(),
            }),
        })
        .collect();

    Ok(MetadataInventory {
        format: Some(format),
        blocks,
        exif: summarize_exif(data),
    })
}

fn summarize_exif(data: &[u8]) -> Option<ExifSummary> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    let field_count = exif.fields().count();
    if field_count == 0 {
        return None;
    }
    let has_gps = exif.fields().any(|f| is_gps(f.tag));

    Some(ExifSummary {
        camera_make: get_string(&exif, Tag::Make),
        camera_model: get_string(&exif, Tag::Model),
        captured_at: get_string(&exif, Tag::DateTimeOriginal)
            .or_else(|| get_string(&exif, Tag::DateTime)),
        has_gps,
        field_count,
    })
}

fn get_string(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY).map(|f| {
        let s = f.display_value().to_string();
        s.trim_matches('"').to_string()
    })
}

fn is_gps(tag: Tag) -> bool {
    tag.context() == exif::Context::Gps
}
