use crate::{
    dsp::distortion::{mix, saturate},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const DRIVE: usize = 0;
pub const MIX: usize = 1;
pub const LEVEL: usize = 2;

pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::exponential("drive", 1.0, 50.0, 4.0),
    ParamSpec::linear("mix", 0.0, 1.0, 1.0),
    ParamSpec::linear("level", 0.0, 1.0, 0.7),
];

/// `tanh` saturation with output level.
pub struct Distortion;

impl EffectProcessor for Distortion {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], _sample_rate: f32) {
        let drive = params.get(DRIVE);
        let amount = params.get(MIX);
        let level = params.get(LEVEL);

        for sample in buffer.iter_mut() {
            *sample = level * mix(*sample, saturate(*sample, drive), amount);
        }
    }

    fn reset(&mut self) {}
}
