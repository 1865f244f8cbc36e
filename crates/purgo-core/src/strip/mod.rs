//! Metadata stripping engine.
//!
//! Each supported container is split into blocks (JPEG marker segments,
//! PNG chunks, RIFF chunks). Blocks that carry identifying metadata are
//! dropped and the rest are re-emitted byte for byte, so the compressed
//! image data is never re-encoded and pixels cannot drift.

mod detect;
mod inspect;
mod jpeg;
mod png;
mod verify;
mod webp;

pub use detect::detect;
pub use inspect::{inspect, ExifSummary, MetadataInventory};
pub use verify::exif_absent;

use crate::config::StripConfig;
use crate::error::{StripError, StripResult};
use crate::types::{ContainerFormat, FormatHint, MetadataKind, RemovedBlock};

/// What the rewriter does with a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Disposition {
    Keep,
    /// Embedded colour profile; kept or dropped by policy
    ColorProfile,
    Drop(MetadataKind),
}

/// A contiguous byte range of the source and its fate.
#[derive(Debug)]
pub(crate) struct Block<'a> {
    pub raw: &'a [u8],
    pub disposition: Disposition,
}

impl<'a> Block<'a> {
    pub(crate) fn keep(raw: &'a [u8]) -> Self {
        Self {
            raw,
            disposition: Disposition::Keep,
        }
    }

    pub(crate) fn drop(raw: &'a [u8], kind: MetadataKind) -> Self {
        Self {
            raw,
            disposition: Disposition::Drop(kind),
        }
    }
}

pub(crate) fn parse_blocks(format: ContainerFormat, data: &[u8]) -> StripResult<Vec<Block<'_>>> {
    match format {
        ContainerFormat::Jpeg => jpeg::parse(data),
        ContainerFormat::Png => png::parse(data),
        ContainerFormat::WebP => webp::parse(data),
    }
}

/// A sanitized payload and what was taken out of it.
#[derive(Debug, Clone)]
pub struct Stripped {
    pub payload: Vec<u8>,
    pub format: ContainerFormat,
    pub removed: Vec<RemovedBlock>,
}

/// Removes embedded metadata from JPEG, PNG and WebP payloads.
#[derive(Debug, Clone)]
pub struct MetadataStripper {
    config: StripConfig,
}

impl Default for MetadataStripper {
    fn default() -> Self {
        Self::new(StripConfig::default())
    }
}

impl MetadataStripper {
    pub fn new(config: StripConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }

    /// Strip all metadata from `payload`.
    ///
    /// The container is identified from the payload bytes. `hint` (usually
    /// derived from the filename) only decides how an unrecognized payload
    /// is reported: a payload claiming to be a supported image is corrupt,
    /// anything else is unsupported.
    pub fn strip(&self, payload: &[u8], hint: FormatHint) -> StripResult<Stripped> {
        let start = std::time::Instant::now();

        let format = match detect(payload) {
            Some(format) => format,
            None => return Err(unrecognized(payload, hint)),
        };
        if let Some(declared) = hint.declared() {
            if declared != format {
                tracing::debug!("Payload declared as {} is actually {}", declared, format);
            }
        }

        let blocks = parse_blocks(format, payload)?;
        tracing::trace!("  Parse: {:?} ({} blocks)", start.elapsed(), blocks.len());

        let original = if self.config.verify_pixels {
            let decode_start = std::time::Instant::now();
            let image = verify::decode_pixels(format, payload)
                .map_err(|e| StripError::corrupt(format, e))?;
            tracing::trace!("  Decode: {:?}", decode_start.elapsed());
            Some(image)
        } else {
            None
        };

        let (output, removed) = self.rewrite(format, &blocks);

        if let Some(original) = &original {
            let verify_start = std::time::Instant::now();
            verify::verify_rewrite(format, original, &output)?;
            tracing::trace!("  Verify: {:?}", verify_start.elapsed());
        } else if !verify::exif_absent(&output) {
            return Err(StripError::encode(format, "EXIF still readable in output"));
        }

        tracing::debug!(
            "Stripped {} payload in {:?}: {} -> {} bytes, {} blocks removed",
            format,
            start.elapsed(),
            payload.len(),
            output.len(),
            removed.len()
        );

        Ok(Stripped {
            payload: output,
            format,
            removed,
        })
    }

    fn rewrite(&self, format: ContainerFormat, blocks: &[Block<'_>]) -> (Vec<u8>, Vec<RemovedBlock>) {
        let mut kept = Vec::with_capacity(blocks.len());
        let mut removed = Vec::new();

        for block in blocks {
            let dropped_kind = match &block.disposition {
                Disposition::Keep => None,
                Disposition::ColorProfile if self.config.retain_icc_profile => None,
                Disposition::ColorProfile => Some(MetadataKind::IccProfile),
                Disposition::Drop(kind) => Some(kind.clone()),
            };
            match dropped_kind {
                Some(kind) => removed.push(RemovedBlock {
                    kind,
                    len: block.raw.len(),
                }),
                None => kept.push(block),
            }
        }

        let output = match format {
            ContainerFormat::WebP => webp::assemble(&kept),
            ContainerFormat::Jpeg | ContainerFormat::Png => {
                let len = kept.iter().map(|b| b.raw.len()).sum();
                let mut out = Vec::with_capacity(len);
                for block in &kept {
                    out.extend_from_slice(block.raw);
                }
                out
            }
        };

        (output, removed)
    }
}

/// Strip with the default policy.
pub fn strip(payload: &[u8], hint: FormatHint) -> StripResult<Stripped> {
    MetadataStripper::default().strip(payload, hint)
}

fn unrecognized(payload: &[u8], hint: FormatHint) -> StripError {
    if let Some(declared) = hint.declared() {
        return StripError::corrupt(declared, "payload does not match its declared format");
    }
    // Other image formats carry metadata too but cannot be rewritten losslessly.
    match image::guess_format(payload) {
        Ok(other) => StripError::UnsupportedFormat {
            detail: format!("{other:?} images are not supported").to_lowercase(),
        },
        Err(_) => StripError::NotAnImage {
            detail: "no recognized image signature".into(),
        },
    }
}
