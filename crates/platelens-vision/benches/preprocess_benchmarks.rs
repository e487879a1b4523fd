//! Latency benchmarks for the image side of the prediction path
//!
//! The forward pass dominates end-to-end latency and depends on the
//! checkpoint, so these benches track the parts we fully control: decode,
//! preprocessing, and threshold selection.
//!
//! Run with: cargo bench -p platelens-vision

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use platelens_vision::{select_labels, ImageProcessor};
use std::io::Cursor;

fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode benchmark image");
    bytes
}

/// Benchmark PNG decode for typical upload sizes
fn benchmark_decode(c: &mut Criterion) {
    let cases = vec![
        ("thumbnail_224", png_bytes(&gradient_image(224, 224))),
        ("photo_1024", png_bytes(&gradient_image(1024, 768))),
    ];

    let mut group = c.benchmark_group("Image_Decode");
    group.sample_size(50);

    for (name, bytes) in &cases {
        group.bench_with_input(BenchmarkId::new("png", name), bytes, |b, bytes| {
            b.iter(|| image::load_from_memory(black_box(bytes)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark resize + rescale + normalize into a model input tensor
fn benchmark_preprocess(c: &mut Criterion) {
    let processor = ImageProcessor::default();
    let device = candle_core::Device::Cpu;

    let cases = vec![
        ("already_224", gradient_image(224, 224)),
        ("downscale_1024", gradient_image(1024, 768)),
        ("upscale_96", gradient_image(96, 96)),
    ];

    let mut group = c.benchmark_group("Image_Preprocess");
    group.sample_size(50);

    for (name, image) in &cases {
        group.bench_with_input(BenchmarkId::new("to_tensor", name), image, |b, image| {
            b.iter(|| processor.preprocess(black_box(image), &device).unwrap());
        });
    }

    group.finish();
}

/// Benchmark threshold selection over the vocabulary
fn benchmark_selection(c: &mut Criterion) {
    let probs: Vec<f32> = (0..40).map(|i| (i as f32) / 40.0).collect();

    let mut group = c.benchmark_group("Label_Selection");
    group.sample_size(1000);

    group.bench_function("select_labels", |b| {
        b.iter(|| select_labels(black_box(&probs), black_box(0.3)));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_decode,
    benchmark_preprocess,
    benchmark_selection
);
criterion_main!(benches);
