//! In-memory fixtures shared by unit tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// A small gradient so every pixel differs.
pub(crate) fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 13) as u8, (y * 29) as u8, ((x + y) * 7) as u8])
    }))
}

pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub(crate) fn plain_jpeg() -> Vec<u8> {
    encode(&gradient(16, 16), ImageFormat::Jpeg)
}

pub(crate) fn plain_png() -> Vec<u8> {
    encode(&gradient(16, 16), ImageFormat::Png)
}

pub(crate) fn plain_webp() -> Vec<u8> {
    encode(&gradient(16, 16), ImageFormat::WebP)
}

/// Big-endian TIFF block: IFD0 with Make="Purgo" and a GPS IFD with GPSLatitudeRef="N".
pub(crate) fn tiff_with_gps() -> Vec<u8> {
    let mut t = Vec::new();
    t.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    // IFD0: two entries
    t.extend_from_slice(&[0x00, 0x02]);
    t.extend_from_slice(&[0x01, 0x0F, 0x00, 0x02, 0, 0, 0, 6, 0, 0, 0, 38]);
    t.extend_from_slice(&[0x88, 0x25, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 44]);
    t.extend_from_slice(&[0, 0, 0, 0]);
    // Make value at offset 38
    t.extend_from_slice(b"Purgo\0");
    // GPS IFD at offset 44
    t.extend_from_slice(&[0x00, 0x01]);
    t.extend_from_slice(&[0x00, 0x01, 0x00, 0x02, 0, 0, 0, 2, b'N', 0, 0, 0]);
    t.extend_from_slice(&[0, 0, 0, 0]);
    t
}

pub(crate) fn jpeg_segment(marker: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Insert extra marker segments right after SOI.
pub(crate) fn jpeg_with_segments(jpeg: &[u8], segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = jpeg[..2].to_vec();
    for seg in segments {
        out.extend_from_slice(seg);
    }
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub(crate) fn exif_app1() -> Vec<u8> {
    let mut body = b"Exif\0\0".to_vec();
    body.extend(tiff_with_gps());
    jpeg_segment(0xE1, &body)
}

/// A JPEG carrying EXIF (with GPS), XMP, a comment and IPTC.
pub(crate) fn tagged_jpeg() -> Vec<u8> {
    jpeg_with_segments(
        &plain_jpeg(),
        &[
            exif_app1(),
            jpeg_segment(
                0xE1,
                b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta><dc:creator>Jane</dc:creator></x:xmpmeta>",
            ),
            jpeg_segment(0xED, b"Photoshop 3.0\08BIM\x04\x04\0\0\0\0\0\0"),
            jpeg_segment(0xFE, b"taken at 221B Baker Street"),
        ],
    )
}

pub(crate) fn png_chunk(ty: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 12);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(ty);
    out.extend_from_slice(body);
    let mut crc_input = ty.to_vec();
    crc_input.extend_from_slice(body);
    out.extend_from_slice(&crc32fast::hash(&crc_input).to_be_bytes());
    out
}

/// A PNG with tEXt, eXIf and tIME chunks inserted after IHDR.
pub(crate) fn tagged_png() -> Vec<u8> {
    let plain = plain_png();
    // signature (8) + IHDR chunk (25)
    let split = 8 + 25;
    let mut out = plain[..split].to_vec();
    out.extend(png_chunk(b"tEXt", b"Author\0Jane Doe"));
    out.extend(png_chunk(b"eXIf", &tiff_with_gps()));
    out.extend(png_chunk(b"tIME", &[0x07, 0xE8, 5, 17, 12, 30, 0]));
    out.extend_from_slice(&plain[split..]);
    out
}

pub(crate) fn webp_chunk(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = fourcc.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// Wrap a simple lossless WebP into the extended layout with EXIF and XMP chunks.
pub(crate) fn tagged_webp() -> Vec<u8> {
    let simple = plain_webp();
    let image_chunk = &simple[12..];
    let (w, h) = (16u32 - 1, 16u32 - 1);

    let mut vp8x = vec![0x08 | 0x04, 0, 0, 0];
    vp8x.extend_from_slice(&w.to_le_bytes()[..3]);
    vp8x.extend_from_slice(&h.to_le_bytes()[..3]);

    let mut body = webp_chunk(b"VP8X", &vp8x);
    body.extend_from_slice(image_chunk);
    body.extend(webp_chunk(b"EXIF", &tiff_with_gps()));
    body.extend(webp_chunk(b"XMP ", b"<x:xmpmeta/>"));

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend(body);
    out
}
