use crate::{
    dsp::distortion::{mix, quantize},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const BITS: usize = 0;
pub const DOWNSAMPLE: usize = 1;
pub const MIX: usize = 2;

pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::linear("bits", 1.0, 16.0, 8.0),
    ParamSpec::linear("downsample", 1.0, 64.0, 4.0),
    ParamSpec::linear("mix", 0.0, 1.0, 1.0),
];

/// Sample-and-hold plus amplitude quantisation.
pub struct Bitcrusher {
    hold: f32,
    counter: u32,
}

impl Bitcrusher {
    pub fn new() -> Self {
        Self {
            hold: 0.0,
            counter: 0,
        }
    }
}

impl EffectProcessor for Bitcrusher {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], _sample_rate: f32) {
        let bits = params.get(BITS).round();
        let factor = params.get(DOWNSAMPLE).round().max(1.0) as u32;
        let amount = params.get(MIX);

        for sample in buffer.iter_mut() {
            if self.counter == 0 {
                self.hold = quantize(*sample, bits);
            }
            self.counter += 1;
            if self.counter >= factor {
                self.counter = 0;
            }
            *sample = mix(*sample, self.hold, amount);
        }
    }

    fn reset(&mut self) {
        self.hold = 0.0;
        self.counter = 0;
    }
}
