//! Envelope module: control source and voice VCA.
//!
//! The envelope advances during the control pass, writing one level per
//! frame into the module's control buffer. In the audio pass the same levels
//! shape the voice buffer:
//!
//! ```text
//! gain = (1 − depth + depth·level) · (1 − vs + vs·velocity)
//! ```
//!
//! With `depth = 0` the envelope leaves the audio untouched and acts purely
//! as a modulation source.

use crate::dsp::{envelope::Envelope, modulate::block_average};

use super::{
    context::RenderCtx,
    params::{ParamSet, ParamSpec},
};

pub const ATTACK: usize = 0;
pub const DECAY: usize = 1;
pub const SUSTAIN: usize = 2;
pub const RELEASE: usize = 3;
pub const DEPTH: usize = 4;
pub const VELOCITY: usize = 5;

pub static PARAMS: [ParamSpec; 6] = [
    ParamSpec::exponential("attack", 0.0005, 20.0, 0.01),
    ParamSpec::exponential("decay", 0.0005, 20.0, 0.1),
    ParamSpec::linear("sustain", 0.0, 1.0, 0.7),
    ParamSpec::exponential("release", 0.0005, 20.0, 0.3),
    ParamSpec::linear("depth", 0.0, 1.0, 1.0),
    ParamSpec::linear("velocity", 0.0, 1.0, 1.0),
];

/// Render this block's levels. Returns their average.
pub(super) fn advance(
    env: &mut Envelope,
    params: &ParamSet,
    levels: &mut [f32],
    ctx: &RenderCtx,
) -> f32 {
    env.set_adsr(
        params.get(ATTACK),
        params.get(DECAY),
        params.get(SUSTAIN),
        params.get(RELEASE),
    );
    env.render(levels, ctx);
    block_average(levels)
}

pub(super) fn apply_vca(levels: &[f32], params: &ParamSet, buffer: &mut [f32], ctx: &RenderCtx) {
    let depth = params.get(DEPTH);
    let sensitivity = params.get(VELOCITY);
    let velocity_gain = 1.0 - sensitivity + sensitivity * ctx.velocity;

    for (sample, &level) in buffer.iter_mut().zip(levels) {
        *sample *= (1.0 - depth + depth * level) * velocity_gain;
    }
}
