//! Chorus: a short delay whose length wobbles under a sine LFO.
//!
//! ```text
//! delay(t) = 25 ms + depth_ms · (sin(2π·rate·t) · 0.5 + 0.5)
//! ```
//!
//! The read position is fractional, so the line is read with linear
//! interpolation. A little feedback thickens the effect.

use std::f32::consts::TAU;

use crate::{
    dsp::{delay::DelayLine, distortion::mix},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const RATE: usize = 0;
pub const DEPTH_MS: usize = 1;
pub const MIX: usize = 2;
pub const FEEDBACK: usize = 3;

pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::exponential("rate", 0.05, 10.0, 0.8),
    ParamSpec::linear("depth_ms", 0.0, 20.0, 5.0),
    ParamSpec::linear("mix", 0.0, 1.0, 0.5),
    ParamSpec::linear("feedback", 0.0, 0.9, 0.2),
];

const BASE_DELAY_MS: f32 = 25.0;

pub struct Chorus {
    line: DelayLine,
    phase: f32,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        let max_ms = BASE_DELAY_MS + PARAMS[DEPTH_MS].max + 2.0;
        Self {
            line: DelayLine::from_seconds(max_ms / 1000.0, sample_rate),
            phase: 0.0,
        }
    }
}

impl EffectProcessor for Chorus {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        let step = params.get(RATE) / sample_rate;
        let depth = params.get(DEPTH_MS) / 1000.0 * sample_rate;
        let base = BASE_DELAY_MS / 1000.0 * sample_rate;
        let amount = params.get(MIX);
        let feedback = params.get(FEEDBACK);

        for sample in buffer.iter_mut() {
            let lfo = (TAU * self.phase).sin() * 0.5 + 0.5;
            let wet = self.line.read_interpolated(base + lfo * depth);
            self.line.write(*sample + wet * feedback);
            *sample = mix(*sample, wet, amount);
            self.phase = (self.phase + step).fract();
        }
    }

    fn reset(&mut self) {
        self.line.reset();
        self.phase = 0.0;
    }
}
