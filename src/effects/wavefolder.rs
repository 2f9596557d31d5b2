use crate::{
    dsp::distortion::{mix, wavefold},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const DRIVE: usize = 0;
pub const MIX: usize = 1;

pub static PARAMS: [ParamSpec; 2] = [
    ParamSpec::exponential("drive", 1.0, 20.0, 2.0),
    ParamSpec::linear("mix", 0.0, 1.0, 1.0),
];

pub struct Wavefolder;

impl EffectProcessor for Wavefolder {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], _sample_rate: f32) {
        let drive = params.get(DRIVE);
        let amount = params.get(MIX);
        for sample in buffer.iter_mut() {
            *sample = mix(*sample, wavefold(*sample, drive), amount);
        }
    }

    fn reset(&mut self) {}
}
