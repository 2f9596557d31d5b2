//! Audio oscillator module: layers a waveform into the voice buffer.

use crate::dsp::oscillator::OscillatorBlock;

use super::{
    context::RenderCtx,
    params::{ParamSet, ParamSpec},
};

pub const PITCH: usize = 0;
pub const DETUNE: usize = 1;
pub const GAIN: usize = 2;
pub const DUTY: usize = 3;

pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::linear("pitch", -48.0, 48.0, 0.0),
    ParamSpec::linear("detune", -100.0, 100.0, 0.0),
    ParamSpec::linear("gain", 0.0, 1.0, 1.0),
    ParamSpec::linear("duty", 0.01, 0.99, 0.5),
];

/// Note frequency offset by the pitch and detune parameters.
#[inline]
pub fn frequency(params: &ParamSet, ctx: &RenderCtx) -> f32 {
    let semitones = params.get(PITCH) + params.get(DETUNE) / 100.0;
    let nyquist = ctx.sample_rate * 0.5;
    (ctx.frequency * 2f32.powf(semitones / 12.0)).clamp(0.0, nyquist)
}

/// Add this oscillator into `buffer`. Returns the block average of its own
/// contribution.
pub(super) fn process(
    osc: &mut OscillatorBlock,
    params: &ParamSet,
    buffer: &mut [f32],
    ctx: &RenderCtx,
) -> f32 {
    let freq = frequency(params, ctx);
    let gain = params.get(GAIN);
    let duty = params.get(DUTY);

    let mut sum = 0.0f32;
    for sample in buffer.iter_mut() {
        let value = gain * osc.next_sample(freq, ctx.sample_rate, duty);
        *sample += value;
        sum += value;
    }
    if buffer.is_empty() {
        0.0
    } else {
        sum / buffer.len() as f32
    }
}
