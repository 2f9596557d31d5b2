//! Benchmarks for the biquad filters.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::dsp::filter::{Biquad, FilterType, ResonantFilter};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        // Fixed coefficients
        let mut filter = Biquad::lowpass(1000.0, 0.707, SAMPLE_RATE);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("biquad", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer));
            })
        });

        for filter_type in [FilterType::LowPass, FilterType::HighPass, FilterType::BandPass] {
            let mut filter = ResonantFilter::new(filter_type);
            filter.configure(1000.0, 0.5, SAMPLE_RATE);
            let mut buffer = input.clone();
            group.bench_with_input(
                BenchmarkId::new(filter_type.name(), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        buffer.copy_from_slice(&input);
                        filter.render(black_box(&mut buffer));
                    })
                },
            );
        }

        // Cutoff swept every block, as under envelope modulation
        let mut filter = ResonantFilter::new(FilterType::LowPass);
        let mut buffer = input.clone();
        let mut cutoff = 200.0f32;
        group.bench_with_input(BenchmarkId::new("swept", size), &size, |b, _| {
            b.iter(|| {
                cutoff = if cutoff > 8_000.0 { 200.0 } else { cutoff * 1.05 };
                filter.configure(black_box(cutoff), 0.5, SAMPLE_RATE);
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
