//! Lead patch.
//!
//! A bright, cutting lead built from a sawtooth and a quieter, slightly
//! detuned square.
//!
//! # How It Works
//!
//! 1. Saw plus square give a thick, full harmonic spectrum
//! 2. Low-pass filter opens with the envelope on every note
//! 3. A 5 Hz sine LFO adds gentle vibrato to both oscillators
//! 4. A short delay places it in a room
//!
//! # Variations
//!
//! - Raise the LFO depth = more dramatic vibrato
//! - Resonance towards 0.7 = squelchy, vocal lead
//! - Delay mix up = spacey lead

use crate::{
    dsp::{envelope::EnvelopeCurve, filter::FilterType, oscillator::Waveform},
    effects::EffectType,
    module::ModuleShape,
    patch::Patch,
};

pub fn lead() -> Patch {
    super::build("lead", |p| {
        let saw = p.add_module(ModuleShape::Oscillator(Waveform::Saw))?;
        let square = p.add_module(ModuleShape::Oscillator(Waveform::Square))?;
        p.set_parameter(square, "detune", 7.0)?;
        p.set_parameter(square, "gain", 0.5)?;

        let filter = p.add_module(ModuleShape::Filter(FilterType::LowPass))?;
        p.set_parameter(filter, "cutoff", 1_800.0)?;
        p.set_parameter(filter, "resonance", 0.3)?;

        let env = p.add_module(ModuleShape::Envelope(EnvelopeCurve::Exponential))?;
        p.set_parameter(env, "attack", 0.005)?;
        p.set_parameter(env, "decay", 0.15)?;
        p.set_parameter(env, "sustain", 0.7)?;
        p.set_parameter(env, "release", 0.2)?;

        let vibrato = p.add_module(ModuleShape::Lfo(Waveform::Sine))?;
        p.set_parameter(vibrato, "rate", 5.0)?;

        p.connect(env, filter, "cutoff", 0.25)?;
        p.connect(vibrato, saw, "pitch", 0.002)?;
        p.connect(vibrato, square, "pitch", 0.002)?;

        let delay = p.add_effect(EffectType::Delay)?;
        p.set_parameter(delay, "time_ms", 320.0)?;
        p.set_parameter(delay, "feedback", 0.3)?;
        p.set_parameter(delay, "mix", 0.2)?;
        Ok(())
    })
}
