//! Benchmarks for document conversion.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use docpdf::{detect_format, ConvertOptions, Converter, InputFile};
use std::io::Cursor;

/// Generate Markdown with the given number of sections.
fn create_test_markdown(sections: usize) -> String {
    let mut content = String::from("---\ntitle: Benchmark\n---\n\n");
    for i in 0..sections {
        content.push_str(&format!("## Section {}\n\n", i + 1));
        content.push_str(
            "Lorem ipsum dolor sit amet, **consectetur** adipiscing elit, sed do eiusmod \
             tempor incididunt ut labore et dolore magna aliqua. See [docs](http://x.y).\n\n",
        );
        content.push_str("- first item\n- second item\n  - nested item\n\n");
        content.push_str("```\nfn main() {}\n```\n\n");
    }
    content
}

fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// Benchmark format detection.
fn bench_format_detection(c: &mut Criterion) {
    let png = InputFile::from_bytes("upload", create_test_png(8, 8));
    let text = InputFile::from_bytes("upload", b"Just some plain text".to_vec());

    c.bench_function("detect_png_bytes", |b| {
        b.iter(|| detect_format(black_box(&png)).unwrap());
    });

    c.bench_function("detect_text_bytes", |b| {
        b.iter(|| detect_format(black_box(&text)).unwrap());
    });
}

/// Benchmark Markdown conversion at various sizes.
fn bench_markdown_conversion(c: &mut Criterion) {
    let converter = Converter::new();
    let mut group = c.benchmark_group("markdown_conversion");

    for sections in [1, 10, 50].iter() {
        let file = InputFile::from_bytes("bench.md", create_test_markdown(*sections).into_bytes());

        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| converter.convert(black_box(&file), None, None).unwrap());
        });
    }

    group.finish();
}

/// Benchmark image embedding (lossless re-encode).
fn bench_image_conversion(c: &mut Criterion) {
    let converter = Converter::new();
    let file = InputFile::from_bytes("bench.png", create_test_png(512, 512));

    c.bench_function("png_512", |b| {
        b.iter(|| converter.convert(black_box(&file), None, None).unwrap());
    });
}

/// Benchmark parallel batch conversion.
fn bench_batch_conversion(c: &mut Criterion) {
    let files: Vec<InputFile> = (0..8)
        .map(|i| InputFile::from_bytes(format!("doc{i}.md"), create_test_markdown(5).into_bytes()))
        .collect();

    c.bench_function("batch_8_parallel", |b| {
        b.iter(|| docpdf::convert_batch(black_box(&files), ConvertOptions::default()));
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_markdown_conversion,
    bench_image_conversion,
    bench_batch_conversion,
);
criterion_main!(benches);
