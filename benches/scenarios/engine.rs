//! Benchmarks for preset patches rendered through the full engine.
//!
//! Covers voice allocation, the control pass, modulation routing, the
//! audio pipeline and the global effects chain in one number.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use patchbay::{engine, presets, EngineConfig};

use crate::BLOCK_SIZES;

const VOICE_COUNTS: &[usize] = &[1, 8, 16];
const CHORD: &[u8] = &[48, 52, 55, 59, 60, 64, 67, 71, 72, 76, 79, 83, 84, 88, 91, 95];

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let config = EngineConfig::default()
            .with_channels(1)
            .with_block_size(size)
            .with_polyphony(16);
        let mut buffer = vec![0.0f32; size];

        for name in ["lead", "pad", "keys"] {
            for &voices in VOICE_COUNTS {
                let Some(patch) = presets::by_name(name) else {
                    continue;
                };
                let (mut engine, mut controller) = engine::create(config.clone(), patch)
                    .expect("benchmark config is valid");
                for (i, &note) in CHORD.iter().take(voices).enumerate() {
                    controller
                        .note_on(note, 100u8, i as u64)
                        .expect("command queue has room");
                }
                // Drain the note-ons before timing
                engine.render_block(&mut buffer);

                group.bench_with_input(
                    BenchmarkId::new(format!("{name}_x{voices}"), size),
                    &size,
                    |b, _| {
                        b.iter(|| {
                            engine.render_block(black_box(&mut buffer));
                        })
                    },
                );
            }
        }
    }

    group.finish();
}
