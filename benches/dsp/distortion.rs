//! Benchmarks for waveshaping distortion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::dsp::distortion;

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sine-like values)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 0.1).sin())
            .collect();

        // tanh saturation
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("saturate", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                distortion::saturate_buffer(black_box(&mut buffer), black_box(4.0));
            })
        });

        // Hard clip - abrupt limiting
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("hard_clip", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    *sample = distortion::hard_clip(*sample, black_box(2.0), black_box(0.8));
                }
            })
        });

        // Wavefold - sin() per sample
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("wavefold", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                distortion::wavefold_buffer(black_box(&mut buffer), black_box(3.0));
            })
        });

        // Bit reduction
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("quantize", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    *sample = distortion::quantize(*sample, black_box(6.0));
                }
            })
        });
    }

    group.finish();
}
