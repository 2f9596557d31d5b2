use crate::{
    dsp::{delay::DelayLine, distortion::mix},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const TIME_MS: usize = 0;
pub const FEEDBACK: usize = 1;
pub const MIX: usize = 2;

pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::exponential("time_ms", 1.0, 2_000.0, 350.0),
    ParamSpec::linear("feedback", 0.0, 0.95, 0.4),
    ParamSpec::linear("mix", 0.0, 1.0, 0.3),
];

const MAX_SECONDS: f32 = 2.0;

/// Feedback echo.
pub struct Delay {
    line: DelayLine,
}

impl Delay {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            line: DelayLine::from_seconds(MAX_SECONDS, sample_rate),
        }
    }
}

impl EffectProcessor for Delay {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        let delay = (params.get(TIME_MS) / 1000.0 * sample_rate).round() as usize;
        let feedback = params.get(FEEDBACK);
        let amount = params.get(MIX);

        for sample in buffer.iter_mut() {
            let dry = *sample;
            let wet = self.line.read(delay);
            self.line.write(dry + wet * feedback);
            *sample = mix(dry, wet, amount);
        }
    }

    fn reset(&mut self) {
        self.line.reset();
    }
}
