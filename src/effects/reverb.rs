use crate::{
    dsp::{distortion::mix, reverb::SchroederReverb},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const ROOM_SIZE: usize = 0;
pub const DAMPING: usize = 1;
pub const MIX: usize = 2;

pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::linear("room_size", 0.0, 1.0, 0.5),
    ParamSpec::linear("damping", 0.0, 1.0, 0.5),
    ParamSpec::linear("mix", 0.0, 1.0, 0.3),
];

pub struct Reverb {
    reverb: SchroederReverb,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            reverb: SchroederReverb::new(sample_rate),
        }
    }
}

impl EffectProcessor for Reverb {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], _sample_rate: f32) {
        self.reverb.set_room_size(params.get(ROOM_SIZE));
        self.reverb.set_damping(params.get(DAMPING));
        let amount = params.get(MIX);

        for sample in buffer.iter_mut() {
            let wet = self.reverb.process(*sample);
            *sample = mix(*sample, wet, amount);
        }
    }

    fn reset(&mut self) {
        self.reverb.reset();
    }
}
