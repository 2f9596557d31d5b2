//! Benchmarks for the global effects chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::{
    effects::{EffectType, EffectsChain},
    module::ModuleSpec,
    ModuleId, ModuleShape,
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

fn chain(effects: &[EffectType]) -> EffectsChain {
    let specs: Vec<ModuleSpec> = effects
        .iter()
        .enumerate()
        .map(|(i, &effect)| ModuleSpec::new(ModuleId(i as u32), ModuleShape::Effect(effect)))
        .collect();
    EffectsChain::from_specs(&specs, SAMPLE_RATE)
}

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/effects");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        let mut buffer = input.clone();

        // Each effect on its own
        for effect in EffectType::ALL {
            let mut single = chain(&[effect]);
            group.bench_with_input(BenchmarkId::new(effect.name(), size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    single.process(black_box(&mut buffer));
                })
            });
        }

        // Every effect in series
        let mut full = chain(&EffectType::ALL);
        group.bench_with_input(BenchmarkId::new("full_chain", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                full.process(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
