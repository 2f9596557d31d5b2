use crate::dsp::{modulate::block_average, oscillator::OscillatorBlock};

use super::params::{ParamSet, ParamSpec};

pub const RATE: usize = 0;
pub const LEVEL: usize = 1;

pub static PARAMS: [ParamSpec; 2] = [
    ParamSpec::exponential("rate", 0.01, 50.0, 1.0),
    ParamSpec::linear("level", 0.0, 1.0, 0.0),
];

/// Render this block's LFO values (bipolar). Returns their average.
pub(super) fn advance(
    osc: &mut OscillatorBlock,
    params: &ParamSet,
    values: &mut [f32],
    sample_rate: f32,
) -> f32 {
    osc.render(values, params.get(RATE), sample_rate, 0.5);
    block_average(values)
}

/// Mix the LFO into the audio path when its level is non-zero.
pub(super) fn apply_audio(values: &[f32], params: &ParamSet, buffer: &mut [f32]) {
    let level = params.get(LEVEL);
    if level == 0.0 {
        return;
    }
    for (sample, &value) in buffer.iter_mut().zip(values) {
        *sample += level * value;
    }
}
