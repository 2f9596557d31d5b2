//! Phaser: four first-order all-pass stages swept by a sine LFO.
//!
//! ```text
//! x ──(+)──→ [AP] → [AP] → [AP] → [AP] ──┬──→ wet
//!      ↑                                 │
//!      └────────── feedback ─────────────┘
//! ```
//!
//! Each stage is `y = −a·x + z; z = x + a·y` with
//! `a = (1 − tan(π·fc/sr)) / (1 + tan(π·fc/sr))`. The break frequency sweeps
//! logarithmically between 200 Hz and 4 kHz. Mixing the phase-shifted copy
//! with the dry signal carves moving notches.

use std::f32::consts::{PI, TAU};

use crate::{
    dsp::distortion::mix,
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const RATE: usize = 0;
pub const DEPTH: usize = 1;
pub const FEEDBACK: usize = 2;
pub const MIX: usize = 3;

pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::exponential("rate", 0.05, 10.0, 0.5),
    ParamSpec::linear("depth", 0.0, 1.0, 0.7),
    ParamSpec::linear("feedback", 0.0, 0.9, 0.5),
    ParamSpec::linear("mix", 0.0, 1.0, 0.5),
];

const SWEEP_MIN_HZ: f32 = 200.0;
const SWEEP_MAX_HZ: f32 = 4_000.0;

#[derive(Default)]
struct AllpassStage {
    a1: f32,
    z: f32,
}

impl AllpassStage {
    #[inline]
    fn set_fc(&mut self, fc: f32, sample_rate: f32) {
        let w = (PI * (fc / sample_rate).min(0.49)).tan();
        self.a1 = (1.0 - w) / (1.0 + w);
    }

    #[inline]
    fn tick(&mut self, x: f32) -> f32 {
        let y = -self.a1 * x + self.z;
        self.z = x + self.a1 * y;
        y
    }
}

pub struct Phaser {
    stages: [AllpassStage; 4],
    phase: f32,
    last: f32,
}

impl Phaser {
    pub fn new() -> Self {
        Self {
            stages: Default::default(),
            phase: 0.0,
            last: 0.0,
        }
    }
}

impl EffectProcessor for Phaser {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        let step = params.get(RATE) / sample_rate;
        let depth = params.get(DEPTH);
        let feedback = params.get(FEEDBACK);
        let amount = params.get(MIX);
        let span = SWEEP_MAX_HZ / SWEEP_MIN_HZ;

        for sample in buffer.iter_mut() {
            let sweep = (TAU * self.phase).sin() * 0.5 + 0.5;
            let fc = SWEEP_MIN_HZ * span.powf(depth * sweep);
            for stage in &mut self.stages {
                stage.set_fc(fc, sample_rate);
            }

            let input = *sample + self.last * feedback;
            let wet = self.stages.iter_mut().fold(input, |x, stage| stage.tick(x));
            self.last = wet;
            *sample = mix(*sample, wet, amount);
            self.phase = (self.phase + step).fract();
        }
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.z = 0.0;
        }
        self.phase = 0.0;
        self.last = 0.0;
    }
}
