//! Segment read/write throughput benchmarks.

use criterion::{Criterion, criterion_group, criterion_main};
use smos_shared_memory::Segment;
use std::hint::black_box;

fn bench_write_operations(c: &mut Criterion) {
    let mut segment = Segment::create_unique("bench_write", 65536).unwrap();

    let data_64 = vec![0xAAu8; 64];
    let data_1k = vec![0xAAu8; 1024];
    let data_4k = vec![0xAAu8; 4096];

    c.bench_function("write_64_bytes", |b| {
        b.iter(|| black_box(segment.write_at(0, &data_64).unwrap()));
    });
    c.bench_function("write_1k_bytes", |b| {
        b.iter(|| black_box(segment.write_at(0, &data_1k).unwrap()));
    });
    c.bench_function("write_4k_bytes", |b| {
        b.iter(|| black_box(segment.write_at(0, &data_4k).unwrap()));
    });

    segment.unlink().unwrap();
}

fn bench_read_operations(c: &mut Criterion) {
    let mut segment = Segment::create_unique("bench_read", 65536).unwrap();
    segment.write_at(0, &vec![0xAAu8; 4096]).unwrap();

    c.bench_function("read_4k_bytes", |b| {
        b.iter(|| black_box(segment.read_at(0, 4096).unwrap()));
    });

    segment.unlink().unwrap();
}

criterion_group!(benches, bench_write_operations, bench_read_operations);
criterion_main!(benches);
