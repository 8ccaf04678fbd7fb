//! Criterion benchmarks for the byte-level helpers on the ingest hot path.
//!
//! Run with:
//! ```bash
//! cargo bench --package mow-core --bench decode_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mow_core::protocol::annexb::group_access_units;
use mow_core::protocol::{decode_big_endian_u64, encode_counter};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// An Annex-B stream of `pictures` single-slice pictures, each preceded by
/// SPS and PPS every tenth picture.
fn make_annexb(pictures: usize, slice_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..pictures {
        if i % 10 == 0 {
            out.extend_from_slice(&[0, 0, 0, 1, 0x67, 0x42, 0xC0, 0x1E]);
            out.extend_from_slice(&[0, 0, 0, 1, 0x68, 0xCE, 0x3C, 0x80]);
            out.extend_from_slice(&[0, 0, 0, 1, 0x65, 0x88]);
        } else {
            out.extend_from_slice(&[0, 0, 0, 1, 0x41, 0x9A]);
        }
        out.extend(std::iter::repeat(0x5A).take(slice_len));
    }
    out
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_counter_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter");
    let encoded = encode_counter(987_654_321);
    group.bench_function("decode_8_bytes", |b| {
        b.iter(|| decode_big_endian_u64(black_box(&encoded)))
    });
    group.bench_function("encode", |b| b.iter(|| encode_counter(black_box(987_654_321))));
    group.finish();
}

fn bench_group_access_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_access_units");
    for &slice_len in &[256usize, 4096, 32_768] {
        let stream = make_annexb(60, slice_len);
        group.bench_with_input(
            BenchmarkId::from_parameter(slice_len),
            &stream,
            |b, stream| b.iter(|| group_access_units(black_box(stream))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_counter_decode, bench_group_access_units);
criterion_main!(benches);
