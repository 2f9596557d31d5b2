use crate::{
    dsp::{distortion::mix, oscillator::OscillatorBlock},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const FREQUENCY: usize = 0;
pub const MIX: usize = 1;

pub static PARAMS: [ParamSpec; 2] = [
    ParamSpec::exponential("frequency", 1.0, 5_000.0, 200.0),
    ParamSpec::linear("mix", 0.0, 1.0, 0.5),
];

/// Multiplies the signal by a sine carrier.
pub struct RingModulator {
    carrier: OscillatorBlock,
}

impl RingModulator {
    pub fn new() -> Self {
        Self {
            carrier: OscillatorBlock::sine(),
        }
    }
}

impl EffectProcessor for RingModulator {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        let frequency = params.get(FREQUENCY);
        let amount = params.get(MIX);
        for sample in buffer.iter_mut() {
            let wet = *sample * self.carrier.next_sample(frequency, sample_rate, 0.5);
            *sample = mix(*sample, wet, amount);
        }
    }

    fn reset(&mut self) {
        self.carrier.reset();
    }
}
