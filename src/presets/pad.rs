//! Pad patch - sustained, atmospheric texture.
//!
//! # How It Works
//!
//! 1. Two saws detuned by ±10 cents create width and movement
//! 2. Slow linear attack (800ms) for a gradual swell
//! 3. A slow triangle LFO drifts the cutoff so the sound keeps evolving
//! 4. Long release, chorus and reverb smear it into the background
//!
//! # Variations
//!
//! - More detune (20+ cents) = wider, more dramatic
//! - Lower filter cutoff = darker, more ambient

use crate::{
    dsp::{envelope::EnvelopeCurve, filter::FilterType, oscillator::Waveform},
    effects::EffectType,
    module::ModuleShape,
    patch::Patch,
};

pub fn pad() -> Patch {
    super::build("pad", |p| {
        for detune in [-10.0, 10.0] {
            let osc = p.add_module(ModuleShape::Oscillator(Waveform::Saw))?;
            p.set_parameter(osc, "detune", detune)?;
            p.set_parameter(osc, "gain", 0.6)?;
        }

        let filter = p.add_module(ModuleShape::Filter(FilterType::LowPass))?;
        p.set_parameter(filter, "cutoff", 1_200.0)?;

        let env = p.add_module(ModuleShape::Envelope(EnvelopeCurve::Linear))?;
        p.set_parameter(env, "attack", 0.8)?;
        p.set_parameter(env, "decay", 0.5)?;
        p.set_parameter(env, "sustain", 0.8)?;
        p.set_parameter(env, "release", 1.5)?;

        let drift = p.add_module(ModuleShape::Lfo(Waveform::Triangle))?;
        p.set_parameter(drift, "rate", 0.3)?;
        p.connect(drift, filter, "cutoff", 0.15)?;

        p.add_effect(EffectType::Chorus)?;
        let reverb = p.add_effect(EffectType::Reverb)?;
        p.set_parameter(reverb, "room_size", 0.8)?;
        p.set_parameter(reverb, "mix", 0.35)?;
        Ok(())
    })
}
