use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use img_batch::encode::encode;
use img_batch::processing::resize_image;
use img_batch::{JobPlan, OutputFormat, Quality};

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn bench_plan_creation(c: &mut Criterion) {
    c.bench_function("default_plan_creation", |b| b.iter(JobPlan::default));
}

fn bench_thumbnail(c: &mut Criterion) {
    let img = create_test_image(1920, 1080);

    c.bench_function("thumbnail_150x150", |b| {
        b.iter(|| resize_image(black_box(&img), Some(150), Some(150)))
    });
}

fn bench_encoders(c: &mut Criterion) {
    let img = create_test_image(640, 480);
    let mut group = c.benchmark_group("encode_640x480");
    group.sample_size(10);

    for format in OutputFormat::all_formats() {
        group.bench_with_input(BenchmarkId::from_parameter(format), &format, |b, &format| {
            b.iter(|| encode(black_box(&img), format, Quality::default()))
        });
    }

    group.finish();
}

fn bench_jpeg_quality(c: &mut Criterion) {
    let img = create_test_image(640, 480);
    let mut group = c.benchmark_group("jpeg_quality");

    for quality in [40u8, 80, 95] {
        let q = Quality::new(quality).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(quality), &q, |b, &q| {
            b.iter(|| encode(black_box(&img), OutputFormat::Jpeg, q))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_plan_creation,
    bench_thumbnail,
    bench_encoders,
    bench_jpeg_quality
);
criterion_main!(benches);
