use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gateway::codec::{JPEG_QUALITY, decode_image, encode_jpeg, frame_to_jpeg};
use image::{Rgb, RgbImage};
use inference::{ColorFormat, RenderedFrame};

/// Gradient compresses more like a real photo than a solid fill
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width) as u8,
            ((y * 255) / height) as u8,
            (((x + y) * 127) / (width + height)) as u8,
        ])
    })
}

fn benchmark_jpeg_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("jpeg_encoding");

    let sizes = [
        (640, 480, "VGA"),
        (1280, 720, "HD"),
        (1920, 1080, "Full HD"),
    ];

    for (width, height, label) in sizes {
        let image = gradient(width, height);
        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_with_input(BenchmarkId::new("rgb", label), &image, |b, image| {
            b.iter(|| encode_jpeg(black_box(image), JPEG_QUALITY));
        });

        group.bench_with_input(BenchmarkId::new("bgr_frame", label), &image, |b, image| {
            b.iter(|| {
                let mut frame = RenderedFrame::from_rgb(image.clone());
                frame.format = ColorFormat::Bgr;
                frame_to_jpeg(black_box(frame))
            });
        });
    }

    group.finish();
}

fn benchmark_upload_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload_decode");

    for (width, height, label) in [(640, 480, "VGA"), (1920, 1080, "Full HD")] {
        let Ok(jpeg) = encode_jpeg(&gradient(width, height), JPEG_QUALITY) else {
            continue;
        };
        group.throughput(Throughput::Bytes(jpeg.len() as u64));
        group.bench_with_input(BenchmarkId::new("jpeg", label), &jpeg, |b, jpeg| {
            b.iter(|| decode_image(black_box(jpeg)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_jpeg_encoding, benchmark_upload_decode);
criterion_main!(benches);
