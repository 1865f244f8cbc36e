//! Container detection from magic bytes.
//!
//! Filenames lie; the payload header decides which rewriter runs.

use crate::types::ContainerFormat;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
pub(crate) const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Identify the container of `data`, if it is one the engine can rewrite.
pub fn detect(data: &[u8]) -> Option<ContainerFormat> {
    if data.len() >= JPEG_MAGIC.len() && data[..3] == JPEG_MAGIC {
        return Some(ContainerFormat::Jpeg);
    }

    if data.len() >= PNG_SIGNATURE.len() && data[..8] == PNG_SIGNATURE {
        return Some(ContainerFormat::Png);
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some(ContainerFormat::WebP);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1];
        assert_eq!(detect(&header), Some(ContainerFormat::Jpeg));
    }

    #[test]
    fn test_detect_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        assert_eq!(detect(&header), Some(ContainerFormat::Png));
    }

    #[test]
    fn test_detect_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(detect(&header), Some(ContainerFormat::WebP));
    }

    #[test]
    fn test_detect_rejects_other_riff() {
        // WAVE audio shares the RIFF envelope
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert_eq!(detect(&header), None);
    }

    #[test]
    fn test_detect_rejects_short_and_unknown() {
        assert_eq!(detect(&[]), None);
        assert_eq!(detect(&[0xFF, 0xD8]), None);
        assert_eq!(detect(b"GIF89a......"), None);
        assert_eq!(detect(&[0u8; 64]), None);
    }
}
