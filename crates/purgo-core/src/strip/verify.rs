//! Post-rewrite checks: pixel equality and EXIF absence.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView};

use crate::error::{StripError, StripResult};
use crate::types::ContainerFormat;

/// Decode a payload's primary image with the codec matching `format`.
pub(crate) fn decode_pixels(format: ContainerFormat, data: &[u8]) -> Result<DynamicImage, String> {
    image::load_from_memory_with_format(data, format.image_format()).map_err(|e| e.to_string())
}

/// Dimensions, colour layout and every sample must match.
pub(crate) fn same_pixels(a: &DynamicImage, b: &DynamicImage) -> bool {
    a.dimensions() == b.dimensions() && a.color() == b.color() && a.as_bytes() == b.as_bytes()
}

/// Returns true when no EXIF fields can be read from the container.
pub fn exif_absent(data: &[u8]) -> bool {
    let mut reader = Cursor::new(data);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif.fields().next().is_none(),
        // NotFound, BlankValue and InvalidFormat all mean nothing readable survived.
        Err(_) => true,
    }
}

/// Confirm `rewritten` is a faithful, EXIF-free copy of `original`.
pub(crate) fn verify_rewrite(
    format: ContainerFormat,
    original: &DynamicImage,
    rewritten: &[u8],
) -> StripResult<()> {
    let decoded = decode_pixels(format, rewritten)
        .map_err(|e| StripError::encode(format, format!("output does not decode: {e}")))?;

    if !same_pixels(original, &decoded) {
        return Err(StripError::encode(
            format,
            "output pixels differ from source",
        ));
    }
    if !exif_absent(rewritten) {
        return Err(StripError::encode(format, "EXIF still readable in output"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_same_pixels_detects_sample_change() {
        let a = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
        let mut changed = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        changed.put_pixel(3, 3, Rgb([10, 20, 31]));
        let b = DynamicImage::ImageRgb8(changed);

        assert!(same_pixels(&a, &a.clone()));
        assert!(!same_pixels(&a, &b));
    }

    #[test]
    fn test_same_pixels_detects_layout_change() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        let wide = DynamicImage::ImageRgb8(RgbImage::new(8, 2));
        assert!(!same_pixels(&rgb, &rgba));
        assert!(!same_pixels(&rgb, &wide));
    }

    #[test]
    fn test_exif_absent_on_non_image_bytes() {
        assert!(exif_absent(b"definitely not an image"));
    }
}
