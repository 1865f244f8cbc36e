//! Benchmarks for the Purgo stripping engine.
//!
//! Run with: cargo bench -p purgo-core

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use purgo_core::config::{DedupStrategy, StripConfig};
use purgo_core::ingest::DedupIndex;
use purgo_core::{FormatHint, MetadataStripper};

fn encoded(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(1024, 768, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .expect("encoding a generated image cannot fail");
    buf.into_inner()
}

/// A JPEG with a 4KB EXIF segment spliced in after SOI.
fn tagged_jpeg() -> Vec<u8> {
    let plain = encoded(ImageFormat::Jpeg);
    let mut body = b"Exif\0\0MM\0\x2A\0\0\0\x08\0\0\0\0\0\0".to_vec();
    body.resize(4096, 0);

    let mut out = plain[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&plain[2..]);
    out
}

fn benchmark_strip_jpeg(c: &mut Criterion) {
    let payload = tagged_jpeg();
    let verified = MetadataStripper::default();
    let unverified = MetadataStripper::new(StripConfig {
        verify_pixels: false,
        ..StripConfig::default()
    });

    c.bench_function("strip_jpeg_verified", |b| {
        b.iter(|| verified.strip(black_box(&payload), FormatHint::NONE))
    });
    c.bench_function("strip_jpeg_structural", |b| {
        b.iter(|| unverified.strip(black_box(&payload), FormatHint::NONE))
    });
}

fn benchmark_strip_png(c: &mut Criterion) {
    let payload = encoded(ImageFormat::Png);
    let unverified = MetadataStripper::new(StripConfig {
        verify_pixels: false,
        ..StripConfig::default()
    });

    c.bench_function("strip_png_structural", |b| {
        b.iter(|| unverified.strip(black_box(&payload), FormatHint::NONE))
    });
}

fn benchmark_inspect(c: &mut Criterion) {
    let payload = tagged_jpeg();

    c.bench_function("inspect_jpeg", |b| {
        b.iter(|| purgo_core::inspect(black_box(&payload)))
    });
}

fn benchmark_fingerprint(c: &mut Criterion) {
    let payload = tagged_jpeg();
    let index = DedupIndex::new(DedupStrategy::NameAndContent);

    c.bench_function("fingerprint_blake3", |b| {
        b.iter(|| index.identify("bench.jpg", black_box(&payload)))
    });
}

criterion_group!(
    benches,
    benchmark_strip_jpeg,
    benchmark_strip_png,
    benchmark_inspect,
    benchmark_fingerprint
);
criterion_main!(benches);
