//! Keys patch - electric-piano flavoured sine tones.
//!
//! A sine with a quieter octave above, a long decay to a low sustain and a
//! gentle phaser.

use crate::{
    dsp::{envelope::EnvelopeCurve, oscillator::Waveform},
    effects::EffectType,
    module::ModuleShape,
    patch::Patch,
};

pub fn keys() -> Patch {
    super::build("keys", |p| {
        p.add_module(ModuleShape::Oscillator(Waveform::Sine))?;
        let octave = p.add_module(ModuleShape::Oscillator(Waveform::Sine))?;
        p.set_parameter(octave, "pitch", 12.0)?;
        p.set_parameter(octave, "gain", 0.3)?;

        let env = p.add_module(ModuleShape::Envelope(EnvelopeCurve::Exponential))?;
        p.set_parameter(env, "attack", 0.005)?;
        p.set_parameter(env, "decay", 0.8)?;
        p.set_parameter(env, "sustain", 0.3)?;
        p.set_parameter(env, "release", 0.4)?;

        let eq = p.add_effect(EffectType::Eq)?;
        p.set_parameter(eq, "high_gain_db", -3.0)?;
        let phaser = p.add_effect(EffectType::Phaser)?;
        p.set_parameter(phaser, "mix", 0.3)?;
        Ok(())
    })
}
