use crate::{
    dsp::dynamics::{time_coef, Compressor as GainComputer, CompressorSettings},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const THRESHOLD_DB: usize = 0;
pub const RATIO: usize = 1;
pub const ATTACK_MS: usize = 2;
pub const RELEASE_MS: usize = 3;
pub const MAKEUP_DB: usize = 4;
pub const KNEE_DB: usize = 5;

pub static PARAMS: [ParamSpec; 6] = [
    ParamSpec::linear("threshold_db", -60.0, 0.0, -20.0),
    ParamSpec::linear("ratio", 1.0, 20.0, 4.0),
    ParamSpec::exponential("attack_ms", 0.1, 100.0, 10.0),
    ParamSpec::exponential("release_ms", 10.0, 1_000.0, 100.0),
    ParamSpec::linear("makeup_db", 0.0, 24.0, 0.0),
    ParamSpec::linear("knee_db", 0.0, 24.0, 6.0),
];

pub struct Compressor {
    detector: GainComputer,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            detector: GainComputer::new(),
        }
    }
}

impl EffectProcessor for Compressor {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        let settings = CompressorSettings {
            threshold_db: params.get(THRESHOLD_DB),
            ratio: params.get(RATIO),
            attack_coef: time_coef(params.get(ATTACK_MS), sample_rate),
            release_coef: time_coef(params.get(RELEASE_MS), sample_rate),
            makeup_db: params.get(MAKEUP_DB),
            knee_db: params.get(KNEE_DB),
        };

        for sample in buffer.iter_mut() {
            *sample = self.detector.process(*sample, &settings);
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
    }
}
