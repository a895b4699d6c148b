// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pulse-train microbenchmarks
//!
//! Encoding cost per operand element and the coincidence kernel used for every synapse.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nvmsim_npu_plasticity::pulse_train::{net_pulses, EncodedOperand, Operand, StreamKey};

fn key(operand: Operand, unit: u32) -> StreamKey {
    StreamKey {
        seed: 1,
        epoch: 0,
        step: 0,
        layer: 1,
        operand,
        unit,
    }
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for &len in &[40usize, 256, 1024] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| EncodedOperand::encode(black_box(0.6), 0.45, len, &key(Operand::Input, 3)))
        });
    }
    group.finish();
}

fn bench_coincidences(c: &mut Criterion) {
    let mut group = c.benchmark_group("net_pulses");
    for &len in &[40usize, 256, 1024] {
        let (x, _) = EncodedOperand::encode(0.8, 0.45, len, &key(Operand::Input, 0));
        let (d, _) = EncodedOperand::encode(-0.5, 0.45, len, &key(Operand::Delta, 0));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| net_pulses(black_box(&x), black_box(&d)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_coincidences);
criterion_main!(benches);
