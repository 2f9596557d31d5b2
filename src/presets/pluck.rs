//! Pluck patch - percussive, quickly decaying note.
//!
//! # How It Works
//!
//! 1. Triangle wave for a soft, bell-like tone
//! 2. Instant attack (1ms), medium decay (250ms), no sustain
//! 3. The envelope also closes the filter, so the tone darkens as it fades
//! 4. A touch of reverb for a tail
//!
//! # Variations
//!
//! - Shorter decay (50-80ms) = more percussive, staccato
//! - Square wave = more hollow, synthetic

use crate::{
    dsp::{envelope::EnvelopeCurve, filter::FilterType, oscillator::Waveform},
    effects::EffectType,
    module::ModuleShape,
    patch::Patch,
};

pub fn pluck() -> Patch {
    super::build("pluck", |p| {
        p.add_module(ModuleShape::Oscillator(Waveform::Triangle))?;

        let filter = p.add_module(ModuleShape::Filter(FilterType::LowPass))?;
        p.set_parameter(filter, "cutoff", 3_000.0)?;

        let env = p.add_module(ModuleShape::Envelope(EnvelopeCurve::Exponential))?;
        p.set_parameter(env, "attack", 0.001)?;
        p.set_parameter(env, "decay", 0.25)?;
        p.set_parameter(env, "sustain", 0.0)?;
        p.set_parameter(env, "release", 0.15)?;
        p.connect(env, filter, "cutoff", 0.5)?;

        let reverb = p.add_effect(EffectType::Reverb)?;
        p.set_parameter(reverb, "mix", 0.2)?;
        Ok(())
    })
}
