//! PNG chunk parsing.

use crate::error::{StripError, StripResult};
use crate::types::{ContainerFormat, MetadataKind};

use super::detect::PNG_SIGNATURE;
use super::{Block, Disposition};

/// Ancillary chunks that change how pixels are rendered or animated.
const RENDERING_CHUNKS: &[&[u8; 4]] = &[
    b"tRNS", b"gAMA", b"cHRM", b"sRGB", b"sBIT", b"cICP", b"mDCV", b"cLLI", b"acTL", b"fcTL",
    b"fdAT",
];

const MAX_CHUNK_LEN: usize = 0x7FFF_FFFF;

fn corrupt(message: impl Into<String>) -> StripError {
    StripError::corrupt(ContainerFormat::Png, message)
}

fn chunk_name(ty: &[u8]) -> String {
    String::from_utf8_lossy(ty).into_owned()
}

/// Split a PNG into classified blocks, validating every chunk CRC.
pub(crate) fn parse(data: &[u8]) -> StripResult<Vec<Block<'_>>> {
    if data.len() < PNG_SIGNATURE.len() || data[..8] != PNG_SIGNATURE {
        return Err(corrupt("missing PNG signature"));
    }

    let mut blocks = vec![Block::keep(&data[..8])];
    let mut pos = 8;
    let mut seen_iend = false;

    while pos < data.len() {
        if pos + 12 > data.len() {
            return Err(corrupt("truncated chunk header"));
        }
        let length =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        if length > MAX_CHUNK_LEN {
            return Err(corrupt(format!("chunk length {length} out of range")));
        }
        let end = pos + 12 + length;
        if end > data.len() {
            return Err(corrupt("chunk runs past end of data"));
        }

        let ty: [u8; 4] = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];
        if !ty.iter().all(u8::is_ascii_alphabetic) {
            return Err(corrupt(format!("invalid chunk type at offset {pos}")));
        }

        let stored_crc = u32::from_be_bytes([
            data[end - 4],
            data[end - 3],
            data[end - 2],
            data[end - 1],
        ]);
        let calculated_crc = crc32fast::hash(&data[pos + 4..end - 4]);
        if stored_crc != calculated_crc {
            return Err(corrupt(format!("CRC mismatch in {} chunk", chunk_name(&ty))));
        }

        if blocks.len() == 1 && &ty != b"IHDR" {
            return Err(corrupt("first chunk is not IHDR"));
        }

        let body = &data[pos + 8..end - 4];
        blocks.push(Block {
            raw: &data[pos..end],
            disposition: classify(&ty, body),
        });
        pos = end;

        if &ty == b"IEND" {
            seen_iend = true;
            if pos < data.len() {
                blocks.push(Block::drop(
                    &data[pos..],
                    MetadataKind::Other("trailing data".into()),
                ));
            }
            break;
        }
    }

    if !seen_iend {
        return Err(corrupt("missing IEND chunk"));
    }
    if !blocks.iter().any(|b| b.raw.get(4..8) == Some(b"IDAT".as_slice())) {
        return Err(corrupt("no IDAT chunk"));
    }

    Ok(blocks)
}

fn classify(ty: &[u8; 4], body: &[u8]) -> Disposition {
    match ty {
        b"IHDR" | b"PLTE" | b"IDAT" | b"IEND" => Disposition::Keep,
        t if RENDERING_CHUNKS.contains(&t) => Disposition::Keep,
        b"iCCP" => Disposition::ColorProfile,
        b"eXIf" => Disposition::Drop(MetadataKind::Exif),
        b"tIME" => Disposition::Drop(MetadataKind::Timestamp),
        b"tEXt" | b"zTXt" | b"iTXt" => Disposition::Drop(text_kind(body)),
        // Critical chunks (uppercase first letter) cannot be dropped safely.
        t if t[0].is_ascii_uppercase() => Disposition::Keep,
        t => Disposition::Drop(MetadataKind::Other(chunk_name(t))),
    }
}

/// Textual chunks are keyword-prefixed; some tools smuggle EXIF/XMP/IPTC
/// through them under well-known keywords.
fn text_kind(body: &[u8]) -> MetadataKind {
    let keyword = body.split(|&b| b == 0).next().unwrap_or_default();
    match keyword {
        b"XML:com.adobe.xmp" => MetadataKind::Xmp,
        b"Raw profile type exif" | b"Raw profile type APP1" => MetadataKind::Exif,
        b"Raw profile type iptc" | b"Raw profile type 8bim" => MetadataKind::Iptc,
        _ => MetadataKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_chunk as chunk;

    fn skeleton(ancillary: &[Vec<u8>]) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]));
        for c in ancillary {
            data.extend_from_slice(c);
        }
        data.extend(chunk(b"IDAT", &[0x78, 0x9C, 0x63, 0x60, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01]));
        data.extend(chunk(b"IEND", &[]));
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
    fn test_classifies_ancillary_chunks() {
        let data = skeleton(&[
            chunk(b"gAMA", &[0, 0, 0xB1, 0x8F]),
            chunk(b"iCCP", b"sRGB\0\0xyz"),
            chunk(b"tEXt", b"Author\0Jane Doe"),
            chunk(b"iTXt", b"XML:com.adobe.xmp\0\0\0\0\0<x:xmpmeta/>"),
            chunk(b"eXIf", b"MM\0*\0\0\0\x08\0\0"),
            chunk(b"tIME", &[0x07, 0xE8, 1, 2, 3, 4, 5]),
            chunk(b"pHYs", &[0, 0, 0x0B, 0x13, 0, 0, 0x0B, 0x13, 1]),
        ]);
        let blocks = parse(&data).unwrap();
        assert_eq!(
            dropped(&blocks),
            vec![
                MetadataKind::Text,
                MetadataKind::Xmp,
                MetadataKind::Exif,
                MetadataKind::Timestamp,
                MetadataKind::Other("pHYs".into()),
            ]
        );
        assert!(blocks
            .iter()
            .any(|b| b.disposition == Disposition::ColorProfile));
    }

    #[test]
    fn test_unknown_critical_chunk_is_kept() {
        let data = skeleton(&[chunk(b"ZZZZ", b"opaque")]);
        let blocks = parse(&data).unwrap();
        assert!(dropped(&blocks).is_empty());
    }

    #[test]
    fn test_rejects_bad_crc() {
        let mut data = skeleton(&[chunk(b"tEXt", b"k\0v")]);
        let idx = data.len() - 20;
        data[idx] ^= 0xFF;
        let err = parse(&data).unwrap_err();
        assert!(matches!(err, StripError::CorruptSource { .. }));
    }

    #[test]
    fn test_rejects_missing_iend() {
        let data = skeleton(&[]);
        let err = parse(&data[..data.len() - 12]).unwrap_err();
        assert!(err.to_string().contains("IEND"));
    }

    #[test]
    fn test_rejects_first_chunk_not_ihdr() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(chunk(b"tEXt", b"k\0v"));
        data.extend(chunk(b"IEND", &[]));
        assert!(parse(&data).is_err());
    }
}
