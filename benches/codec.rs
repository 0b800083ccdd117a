use criterion::{black_box, criterion_group, criterion_main, Criterion};
use packfs::compression::{compress, decompress};

/// Benchmark whole-buffer compression of representative payloads
fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");

    let zeros = vec![0u8; 64 * 1024];
    let text = b"the quick brown fox jumps over the lazy dog. ".repeat(1456);

    group.bench_function("zero_fill_64k", |b| {
        b.iter(|| compress(black_box(&zeros)).unwrap());
    });

    group.bench_function("text_64k", |b| {
        b.iter(|| compress(black_box(&text)).unwrap());
    });

    group.finish();
}

/// Benchmark decompression of the same payloads
fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    let zeros = compress(&vec![0u8; 64 * 1024]).unwrap();
    let text = compress(&b"the quick brown fox jumps over the lazy dog. ".repeat(1456)).unwrap();

    group.bench_function("zero_fill_64k", |b| {
        b.iter(|| decompress(black_box(&zeros)).unwrap());
    });

    group.bench_function("text_64k", |b| {
        b.iter(|| decompress(black_box(&text)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
