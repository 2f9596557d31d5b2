//! Bass patch.
//!
//! A classic subtractive bass: square an octave down under a saw, filtered
//! low, with a snappy filter envelope.
//!
//! # How It Works
//!
//! 1. Square one octave below the saw gives weight
//! 2. Low cutoff with resonance keeps it deep but present
//! 3. The envelope kicks the cutoff open on each note (303-style)
//! 4. A compressor evens out the low end
//!
//! # Variations
//!
//! - Higher envelope depth = more aggressive, "acid" bass
//! - Drop the saw = rounder, sub-heavy bass

use crate::{
    dsp::{envelope::EnvelopeCurve, filter::FilterType, oscillator::Waveform},
    effects::EffectType,
    module::ModuleShape,
    patch::Patch,
};

pub fn bass() -> Patch {
    super::build("bass", |p| {
        let sub = p.add_module(ModuleShape::Oscillator(Waveform::Square))?;
        p.set_parameter(sub, "pitch", -12.0)?;
        let saw = p.add_module(ModuleShape::Oscillator(Waveform::Saw))?;
        p.set_parameter(saw, "gain", 0.6)?;

        let filter = p.add_module(ModuleShape::Filter(FilterType::LowPass))?;
        p.set_parameter(filter, "cutoff", 400.0)?;
        p.set_parameter(filter, "resonance", 0.5)?;

        let env = p.add_module(ModuleShape::Envelope(EnvelopeCurve::Exponential))?;
        p.set_parameter(env, "attack", 0.002)?;
        p.set_parameter(env, "decay", 0.2)?;
        p.set_parameter(env, "sustain", 0.6)?;
        p.set_parameter(env, "release", 0.1)?;
        p.connect(env, filter, "cutoff", 0.4)?;

        let compressor = p.add_effect(EffectType::Compressor)?;
        p.set_parameter(compressor, "threshold_db", -18.0)?;
        p.set_parameter(compressor, "ratio", 4.0)?;
        Ok(())
    })
}
