#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use nrbf::cursor::ByteWriter;
use nrbf::Nrbf;

// --- SETUP ---

/// An object array of `count` string records: the shape save files take.
fn build_sample(count: usize) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u8(0x00);
    w.write_i32(1);
    w.write_i32(-1);
    w.write_i32(1);
    w.write_i32(0);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(count as i32);
    for i in 0..count {
        w.write_u8(0x06);
        w.write_i32(i as i32 + 2);
        w.write_string(&format!("item-{i:05}"));
    }
    w.write_u8(0x0B);
    w.finish()
}

// --- BENCHMARKS ---

fn bench_decode(c: &mut Criterion) {
    let bytes = build_sample(10_000);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("object_array_10k_strings", |b| {
        b.iter(|| Nrbf::decode(black_box(&bytes)).expect("decode"))
    });
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let bytes = build_sample(10_000);
    let graph = Nrbf::decode(&bytes).expect("decode");

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("object_array_10k_strings", |b| {
        b.iter(|| Nrbf::encode(black_box(&graph)).expect("encode"))
    });
    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
