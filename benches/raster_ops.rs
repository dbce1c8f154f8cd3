// SPDX-License-Identifier: MPL-2.0
use criterion::{criterion_group, criterion_main, Criterion};
use image_rs::{DynamicImage, Rgba, RgbaImage};
use image_studio::domain::media::EncodedImage;
use image_studio::domain::session::{AspectRatio, CropRect, ImageFilter, Rotation};
use image_studio::media;
use std::hint::black_box;

fn gradient(width: u32, height: u32) -> EncodedImage {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    media::codec::encode_png(&DynamicImage::ImageRgba8(pixels)).unwrap()
}

fn stripes(width: u32, height: u32) -> EncodedImage {
    let pixels = RgbaImage::from_fn(width, height, |x, _| {
        if (x / 16) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    media::codec::encode_png(&DynamicImage::ImageRgba8(pixels)).unwrap()
}

fn raster_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster_ops");
    let photo = gradient(640, 480);
    let mask = stripes(640, 480);

    group.bench_function("pad_to_widescreen", |b| {
        b.iter(|| black_box(media::pad_to_aspect(&photo, AspectRatio::Widescreen).unwrap()));
    });
    group.bench_function("sepia_filter", |b| {
        b.iter(|| black_box(media::apply_filter(&photo, ImageFilter::Sepia).unwrap()));
    });
    group.bench_function("rotate_clockwise", |b| {
        b.iter(|| black_box(media::rotate(&photo, Rotation::Clockwise).unwrap()));
    });
    group.bench_function("crop_center", |b| {
        let rect = CropRect::new(25.0, 25.0, 50.0, 50.0);
        b.iter(|| black_box(media::crop(&photo, &rect).unwrap()));
    });
    group.bench_function("invert_mask", |b| {
        b.iter(|| black_box(media::invert_mask(&photo, Some(&mask)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, raster_benchmark);
criterion_main!(benches);
