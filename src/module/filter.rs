use crate::dsp::filter::ResonantFilter;

use super::{
    context::RenderCtx,
    params::{ParamSet, ParamSpec},
};

pub const CUTOFF: usize = 0;
pub const RESONANCE: usize = 1;

pub static PARAMS: [ParamSpec; 2] = [
    ParamSpec::exponential("cutoff", 20.0, 20_000.0, 1_000.0),
    ParamSpec::linear("resonance", 0.0, 1.0, 0.0),
];

/// Filter the voice buffer in place. Coefficients are redesigned only when
/// the effective cutoff or resonance moved since the last block.
pub(super) fn process(
    filter: &mut ResonantFilter,
    params: &ParamSet,
    buffer: &mut [f32],
    ctx: &RenderCtx,
) {
    filter.configure(params.get(CUTOFF), params.get(RESONANCE), ctx.sample_rate);
    filter.render(buffer);
}
