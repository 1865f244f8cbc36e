//! WebP (RIFF) chunk parsing and reassembly.

use crate::error::{StripError, StripResult};
use crate::types::{ContainerFormat, MetadataKind};

use super::{Block, Disposition};

const VP8X_ICC: u8 = 0x20;
const VP8X_EXIF: u8 = 0x08;
const VP8X_XMP: u8 = 0x04;

fn corrupt(message: impl Into<String>) -> StripError {
    StripError::corrupt(ContainerFormat::WebP, message)
}

/// Split the chunks inside the RIFF envelope into classified blocks.
///
/// The 12-byte RIFF header is not part of the returned blocks; [`assemble`]
/// rebuilds it from whatever chunks are kept.
pub(crate) fn parse(data: &[u8]) -> StripResult<Vec<Block<'_>>> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(corrupt("missing RIFF/WEBP header"));
    }
    let riff_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let riff_end = 8 + riff_size;
    if riff_end > data.len() || riff_size < 4 {
        return Err(corrupt("RIFF size does not match data"));
    }

    let mut blocks = Vec::new();
    let mut pos = 12;
    while pos < riff_end {
        if pos + 8 > riff_end {
            return Err(corrupt("truncated chunk header"));
        }
        let fourcc: [u8; 4] = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
        let size =
            u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                as usize;
        let body_end = pos + 8 + size;
        if body_end > riff_end {
            return Err(corrupt(format!(
                "{} chunk runs past end of data",
                String::from_utf8_lossy(&fourcc)
            )));
        }
        // Odd-sized chunks carry one pad byte; some encoders omit it on the last chunk.
        let end = (body_end + (size & 1)).min(riff_end);

        if blocks.is_empty() && !matches!(&fourcc, b"VP8 " | b"VP8L" | b"VP8X") {
            return Err(corrupt("first chunk is not an image chunk"));
        }
        if &fourcc == b"VP8X" && size < 10 {
            return Err(corrupt("VP8X chunk too short"));
        }

        blocks.push(Block {
            raw: &data[pos..end],
            disposition: classify(&fourcc),
        });
        pos = end;
    }

    if blocks.is_empty() {
        return Err(corrupt("no chunks"));
    }
    if riff_end < data.len() {
        blocks.push(Block::drop(
            &data[riff_end..],
            MetadataKind::Other("trailing data".into()),
        ));
    }

    Ok(blocks)
}

fn classify(fourcc: &[u8; 4]) -> Disposition {
    match fourcc {
        b"VP8 " | b"VP8L" | b"VP8X" | b"ALPH" | b"ANIM" | b"ANMF" => Disposition::Keep,
        b"ICCP" => Disposition::ColorProfile,
        b"EXIF" => Disposition::Drop(MetadataKind::Exif),
        b"XMP " => Disposition::Drop(MetadataKind::Xmp),
        other => Disposition::Drop(MetadataKind::Other(
            String::from_utf8_lossy(other).trim_end().to_string(),
        )),
    }
}

/// Rebuild a RIFF/WEBP file from the kept chunks.
///
/// The VP8X feature flags are recomputed so they never advertise metadata
/// chunks that are no longer present.
pub(crate) fn assemble(kept: &[&Block<'_>]) -> Vec<u8> {
    let body_len: usize = kept.iter().map(|b| b.raw.len()).sum();
    let mut out = Vec::with_capacity(12 + body_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((4 + body_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    for block in kept {
        out.extend_from_slice(block.raw);
    }

    if out.get(12..16) == Some(b"VP8X".as_slice()) {
        let has_icc = kept.iter().any(|b| &b.raw[..4] == b"ICCP");
        let flags = &mut out[20];
        *flags &= !(VP8X_ICC | VP8X_EXIF | VP8X_XMP);
        if has_icc {
            *flags |= VP8X_ICC;
        }
    }
    out
}
