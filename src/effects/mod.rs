//! Effects: stateful block processors used globally after the voice mix and,
//! optionally, inside a voice pipeline.
//!
//! Every effect keeps its internal state (delay lines, filter registers, LFO
//! phase) between blocks, so consecutive blocks join without discontinuity.

pub mod bitcrusher;
pub mod chorus;
pub mod compressor;
pub mod delay;
pub mod distortion;
pub mod eq;
pub mod phaser;
pub mod reverb;
pub mod ring_mod;
pub mod wavefolder;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::guard::sanitize,
    module::{params::ParamSet, params::ParamSpec, Module, ModuleSpec},
};

/// Uniform interface over the effect algorithms.
pub trait EffectProcessor: Send {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32);

    fn reset(&mut self);
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectType {
    Delay,
    Reverb,
    Distortion,
    Chorus,
    Compressor,
    Eq,
    Phaser,
    RingMod,
    Bitcrusher,
    Wavefolder,
}

impl EffectType {
    pub const ALL: [EffectType; 10] = [
        EffectType::Delay,
        EffectType::Reverb,
        EffectType::Distortion,
        EffectType::Chorus,
        EffectType::Compressor,
        EffectType::Eq,
        EffectType::Phaser,
        EffectType::RingMod,
        EffectType::Bitcrusher,
        EffectType::Wavefolder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectType::Delay => "delay",
            EffectType::Reverb => "reverb",
            EffectType::Distortion => "distortion",
            EffectType::Chorus => "chorus",
            EffectType::Compressor => "compressor",
            EffectType::Eq => "eq",
            EffectType::Phaser => "phaser",
            EffectType::RingMod => "ring_mod",
            EffectType::Bitcrusher => "bitcrusher",
            EffectType::Wavefolder => "wavefolder",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            EffectType::Delay => &delay::PARAMS,
            EffectType::Reverb => &reverb::PARAMS,
            EffectType::Distortion => &distortion::PARAMS,
            EffectType::Chorus => &chorus::PARAMS,
            EffectType::Compressor => &compressor::PARAMS,
            EffectType::Eq => &eq::PARAMS,
            EffectType::Phaser => &phaser::PARAMS,
            EffectType::RingMod => &ring_mod::PARAMS,
            EffectType::Bitcrusher => &bitcrusher::PARAMS,
            EffectType::Wavefolder => &wavefolder::PARAMS,
        }
    }
}

/// Effect state, one variant per algorithm.
pub enum Effect {
    Delay(delay::Delay),
    Reverb(reverb::Reverb),
    Distortion(distortion::Distortion),
    Chorus(chorus::Chorus),
    Compressor(compressor::Compressor),
    Eq(eq::Equalizer),
    Phaser(phaser::Phaser),
    RingMod(ring_mod::RingModulator),
    Bitcrusher(bitcrusher::Bitcrusher),
    Wavefolder(wavefolder::Wavefolder),
}

impl Effect {
    /// Allocates delay memory for `sample_rate`.
    pub fn new(effect_type: EffectType, sample_rate: f32) -> Self {
        match effect_type {
            EffectType::Delay => Effect::Delay(delay::Delay::new(sample_rate)),
            EffectType::Reverb => Effect::Reverb(reverb::Reverb::new(sample_rate)),
            EffectType::Distortion => Effect::Distortion(distortion::Distortion),
            EffectType::Chorus => Effect::Chorus(chorus::Chorus::new(sample_rate)),
            EffectType::Compressor => Effect::Compressor(compressor::Compressor::new()),
            EffectType::Eq => Effect::Eq(eq::Equalizer::new()),
            EffectType::Phaser => Effect::Phaser(phaser::Phaser::new()),
            EffectType::RingMod => Effect::RingMod(ring_mod::RingModulator::new()),
            EffectType::Bitcrusher => Effect::Bitcrusher(bitcrusher::Bitcrusher::new()),
            EffectType::Wavefolder => Effect::Wavefolder(wavefolder::Wavefolder),
        }
    }

    fn processor(&mut self) -> &mut dyn EffectProcessor {
        match self {
            Effect::Delay(e) => e,
            Effect::Reverb(e) => e,
            Effect::Distortion(e) => e,
            Effect::Chorus(e) => e,
            Effect::Compressor(e) => e,
            Effect::Eq(e) => e,
            Effect::Phaser(e) => e,
            Effect::RingMod(e) => e,
            Effect::Bitcrusher(e) => e,
            Effect::Wavefolder(e) => e,
        }
    }

    pub fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        self.processor().process(params, buffer, sample_rate);
    }

    pub fn reset(&mut self) {
        self.processor().reset();
    }
}

/// Maximum number of global effects.
pub const MAX_EFFECTS: usize = 16;

/// The global, post-mix chain. Built off the render thread and swapped in
/// whole.
pub struct EffectsChain {
    slots: Vec<Module>,
    sample_rate: f32,
}

impl EffectsChain {
    /// Instantiate every effect described by `specs`, in order.
    pub fn from_specs(specs: &[ModuleSpec], sample_rate: f32) -> Self {
        Self {
            slots: specs
                .iter()
                .map(|spec| Module::instantiate(spec, sample_rate))
                .collect(),
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn module_mut(&mut self, index: usize) -> Option<&mut Module> {
        self.slots.get_mut(index)
    }

    /// Run every effect over `buffer` in declared order.
    pub fn process(&mut self, buffer: &mut [f32]) {
        if self.slots.is_empty() {
            return;
        }
        // Keep non-finite input out of the feedback paths
        sanitize(buffer);
        for slot in &mut self.slots {
            slot.process_effect(buffer, self.sample_rate);
            sanitize(buffer);
        }
    }
}

impl fmt::Debug for EffectsChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectsChain")
            .field(
                "effects",
                &self.slots.iter().map(|m| m.shape().shape_name()).collect::<Vec<_>>(),
            )
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
