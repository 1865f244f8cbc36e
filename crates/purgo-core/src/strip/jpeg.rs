//! JPEG marker segment parsing.
//!
//! The file is split into marker segments without touching entropy-coded
//! data. Each segment is classified; the rewriter then re-emits the kept
//! segments byte for byte, so tables, frames and scans survive verbatim.

use crate::error::{StripError, StripResult};
use crate::types::{ContainerFormat, MetadataKind};

use super::{Block, Disposition};

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const COM: u8 = 0xFE;
const TEM: u8 = 0x01;

const EXIF_ID: &[u8] = b"Exif\0\0";
const XMP_ID: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXT_ID: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const JFIF_ID: &[u8] = b"JFIF\0";
const JFXX_ID: &[u8] = b"JFXX\0";
const ICC_ID: &[u8] = b"ICC_PROFILE\0";
const MPF_ID: &[u8] = b"MPF\0";
const PHOTOSHOP_ID: &[u8] = b"Photoshop 3.0\0";
const ADOBE_ID: &[u8] = b"Adobe";

fn corrupt(message: impl Into<String>) -> StripError {
    StripError::corrupt(ContainerFormat::Jpeg, message)
}

#[inline]
fn is_rst(marker: u8) -> bool {
    matches!(marker, 0xD0..=0xD7)
}

/// Split a JPEG into classified blocks covering every input byte.
pub(crate) fn parse(data: &[u8]) -> StripResult<Vec<Block<'_>>> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return Err(corrupt("missing SOI marker"));
    }

    let mut blocks = vec![Block::keep(&data[..2])];
    let mut pos = 2;
    let mut seen_frame = false;

    loop {
        if pos >= data.len() {
            return Err(corrupt("missing EOI marker"));
        }
        if data[pos] != 0xFF {
            return Err(corrupt(format!("expected marker at offset {pos}")));
        }

        // Fill bytes (0xFF runs) belong to the marker that follows them.
        let start = pos;
        while pos + 1 < data.len() && data[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            return Err(corrupt("truncated marker"));
        }
        let marker = data[pos + 1];

        match marker {
            EOI => {
                blocks.push(Block::keep(&data[start..pos + 2]));
                let trailer = &data[pos + 2..];
                if !trailer.is_empty() {
                    // Usually MPF secondary images or vendor thumbnails.
                    blocks.push(Block::drop(trailer, MetadataKind::Thumbnail));
                }
                break;
            }
            SOI => return Err(corrupt("unexpected SOI inside image")),
            m if is_rst(m) || m == TEM => {
                blocks.push(Block::keep(&data[start..pos + 2]));
                pos += 2;
                continue;
            }
            _ => {}
        }

        if pos + 4 > data.len() {
            return Err(corrupt("truncated segment header"));
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 {
            return Err(corrupt(format!("invalid segment length {length}")));
        }
        let end = pos + 2 + length;
        if end > data.len() {
            return Err(corrupt(format!(
                "segment 0x{marker:02X} runs past end of data"
            )));
        }
        let body = &data[pos + 4..end];

        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            seen_frame = true;
        }

        if marker == SOS {
            if !seen_frame {
                return Err(corrupt("scan before frame header"));
            }
            let scan_end = entropy_end(data, end)?;
            blocks.push(Block::keep(&data[start..scan_end]));
            pos = scan_end;
            continue;
        }

        blocks.push(Block {
            raw: &data[start..end],
            disposition: classify(marker, body),
        });
        pos = end;
    }

    if !seen_frame {
        return Err(corrupt("no frame header"));
    }

    Ok(blocks)
}

/// Find where the entropy-coded data following an SOS header ends.
///
/// Stuffed zero bytes and restart markers are part of the scan; any other
/// marker terminates it.
fn entropy_end(data: &[u8], mut pos: usize) -> StripResult<usize> {
    loop {
        while pos < data.len() && data[pos] != 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            return Err(corrupt("scan data truncated"));
        }
        let next = data[pos + 1];
        if next == 0x00 || is_rst(next) {
            pos += 2;
            continue;
        }
        return Ok(pos);
    }
}

fn classify(marker: u8, body: &[u8]) -> Disposition {
    match marker {
        // Kept whole: density plus an optional raw preview of this same image.
        0xE0 if body.starts_with(JFIF_ID) => Disposition::Keep,
        0xE0 if body.starts_with(JFXX_ID) => Disposition::Drop(MetadataKind::Thumbnail),
        0xE1 if body.starts_with(EXIF_ID) => Disposition::Drop(MetadataKind::Exif),
        0xE1 if body.starts_with(XMP_ID) || body.starts_with(XMP_EXT_ID) => {
            Disposition::Drop(MetadataKind::Xmp)
        }
        0xE2 if body.starts_with(ICC_ID) => Disposition::ColorProfile,
        0xE2 if body.starts_with(MPF_ID) => Disposition::Drop(MetadataKind::Thumbnail),
        0xED if body.starts_with(PHOTOSHOP_ID) => Disposition::Drop(MetadataKind::Iptc),
        // Adobe APP14 selects the colour transform; dropping it changes pixels.
        0xEE if body.starts_with(ADOBE_ID) => Disposition::Keep,
        0xE0..=0xEF => Disposition::Drop(MetadataKind::Other(format!("APP{}", marker - 0xE0))),
        COM => Disposition::Drop(MetadataKind::Comment),
        _ => Disposition::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    /// Structurally valid skeleton: SOI, SOF0, SOS with stuffed scan data, EOI.
    fn skeleton(extra: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![0xFF, SOI];
        for seg in extra {
            data.extend_from_slice(seg);
        }
        data.extend(segment(0xC0, &[8, 0, 1, 0, 1, 1, 1, 0x11, 0]));
        data.extend(segment(SOS, &[1, 1, 0, 0, 63, 0]));
        data.extend_from_slice(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56]);
        data.extend_from_slice(&[0xFF, EOI]);
        data
    }

    fn dropped(blocks: &[Block<'_>]) -> Vec<MetadataKind> {
        blocks
            .iter()
            .filter_map(|b| match &b.disposition {
                Disposition::Drop(kind) => Some(kind.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_blocks_cover_entire_input() {
        let data = skeleton(&[segment(0xE1, b"Exif\0\0MM\0*")]);
        let blocks = parse(&data).unwrap();
        let total: usize = blocks.iter().map(|b| b.raw.len()).sum();
        assert_eq!(total, data.len());
    }

    #[test]
    fn test_scan_keeps_stuffed_bytes_and_restart_markers() {
        let data = skeleton(&[]);
        let blocks = parse(&data).unwrap();
        let scan = blocks
            .iter()
            .find(|b| b.raw.len() > 3 && b.raw[1] == SOS)
            .unwrap();
        assert!(scan.raw.ends_with(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56]));
    }

    #[test]
    fn test_classifies_metadata_segments() {
        let data = skeleton(&[
            segment(0xE0, b"JFIF\0\x01\x02\0\0\x01\0\x01\0\0"),
            segment(0xE1, b"Exif\0\0II*\0"),
            segment(0xE1, b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta/>"),
            segment(0xE2, b"ICC_PROFILE\0\x01\x01"),
            segment(0xED, b"Photoshop 3.0\08BIM"),
            segment(0xEE, b"Adobe\0d\0\0\0\0\x01"),
            segment(0xEC, b"Ducky"),
            segment(COM, b"shot on my phone"),
        ]);
        let blocks = parse(&data).unwrap();

        assert_eq!(
            dropped(&blocks),
            vec![
                MetadataKind::Exif,
                MetadataKind::Xmp,
                MetadataKind::Iptc,
                MetadataKind::Other("APP12".into()),
                MetadataKind::Comment,
            ]
        );
        assert_eq!(
            blocks
                .iter()
                .filter(|b| b.disposition == Disposition::ColorProfile)
                .count(),
            1
        );
    }

    #[test]
    fn test_trailing_data_after_eoi_is_dropped() {
        let mut data = skeleton(&[]);
        data.extend_from_slice(b"secondary image bytes");
        let blocks = parse(&data).unwrap();
        assert_eq!(dropped(&blocks), vec![MetadataKind::Thumbnail]);
    }

    #[test]
    fn test_rejects_truncated_input() {
        let data = skeleton(&[]);
        let err = parse(&data[..data.len() - 4]).unwrap_err();
        assert!(matches!(err, StripError::CorruptSource { .. }));

        let err = parse(&[0xFF, SOI, 0xFF, 0xE1, 0x00]).unwrap_err();
        assert!(matches!(err, StripError::CorruptSource { .. }));
    }

    #[test]
    fn test_rejects_missing_frame() {
        let mut data = vec![0xFF, SOI];
        data.extend(segment(COM, b"hello"));
        data.extend_from_slice(&[0xFF, EOI]);
        assert!(parse(&data).is_err());
    }
}
