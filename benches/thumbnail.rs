//! Benchmarks for thumbnail sizing and generation
//!
//! Measures the sizing policies and a full write through in-memory storage
//! at several source resolutions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, RgbImage};
use readcomics::images::{MemoryStorage, ThumbnailField, ThumbnailSize};
use std::io::Cursor;
use std::sync::Arc;

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .expect("encode");
    buf.into_inner()
}

fn bench_target(c: &mut Criterion) {
    let policies = [
        ("width", ThumbnailSize::Width(40)),
        ("height", ThumbnailSize::Height(40)),
        (
            "fit",
            ThumbnailSize::Fit {
                width: 120,
                height: 80,
            },
        ),
    ];

    let mut group = c.benchmark_group("target");
    for (name, size) in policies {
        group.bench_function(name, |b| {
            b.iter(|| black_box(size).target(black_box(1920), black_box(1080)))
        });
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let field = ThumbnailField::new(Arc::new(MemoryStorage::new()), ThumbnailSize::Width(40));

    let mut group = c.benchmark_group("write");
    group.sample_size(20);
    for &(width, height) in &[(200, 200), (800, 600), (1600, 1200)] {
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            let data = encode(width, height, format);
            let id = BenchmarkId::new(format!("{:?}", format), format!("{width}x{height}"));
            group.bench_with_input(id, &data, |b, data| {
                b.iter(|| field.write("bench/source.img", data).expect("write"))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_target, bench_write);
criterion_main!(benches);
