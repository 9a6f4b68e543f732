//! Performance benchmarks for page encoding, decoding and highlighting.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use folio::highlight::apply_markdown;
use folio::richtext::{decode, encode, EditorSurface, TextBuffer};

/// A page of `lines` lines with emphasis markers and a few styled ranges.
fn styled_page(lines: usize) -> TextBuffer {
    let line = "The *tide* came in over the **harbor** wall and _nobody_ noticed.\n";
    let text = line.repeat(lines);
    let mut buffer = TextBuffer::from_text(text.trim_end());
    let line_len = line.chars().count();
    for i in (0..lines).step_by(3) {
        let start = i * line_len;
        buffer.tag_add("underline", start + 4..start + 10);
    }
    apply_markdown(&mut buffer);
    buffer
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for lines in [10, 100, 1000] {
        let buffer = styled_page(lines);
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &buffer, |b, buffer| {
            b.iter(|| black_box(encode(black_box(buffer))));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for lines in [10, 100, 1000] {
        let content = encode(&styled_page(lines));
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &content, |b, content| {
            b.iter(|| {
                let mut buffer = TextBuffer::new();
                decode(black_box(content), &mut buffer).expect("decode failed");
                black_box(buffer);
            });
        });
    }

    group.finish();
}

fn bench_highlight(c: &mut Criterion) {
    let mut group = c.benchmark_group("highlight");

    for lines in [10, 100, 1000] {
        let buffer = styled_page(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &buffer, |b, buffer| {
            b.iter(|| {
                let mut buffer = buffer.clone();
                black_box(apply_markdown(&mut buffer));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_highlight);
criterion_main!(benches);
