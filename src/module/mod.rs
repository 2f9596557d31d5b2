//! Modules: the atomic processing units of a patch.
//!
//! A module is one of a fixed set of tagged variants. Its static description
//! ([`ModuleSpec`]: id, shape, parameter values) lives in the patch and in
//! voice-graph snapshots; its runtime form ([`Module`]) adds the continuous
//! state (phase, filter registers, envelope stage, effect memory) and is owned
//! by exactly one voice or by the global effects chain.
//!
//! ```text
//!                 control pass                audio pass
//!   envelope   levels → outputs[0..2]     buffer *= VCA(levels)
//!   lfo        values → outputs[0..2]     buffer += level · values
//!   oscillator                            buffer += waveform   → outputs[0]
//!   filter                                buffer = biquad(buf) → outputs[0]
//!   effect                                buffer = effect(buf) → outputs[0]
//! ```

pub mod context;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod oscillator;
pub mod params;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use context::{midi_note_to_freq, RenderCtx};

use crate::{
    dsp::{
        envelope::{Envelope, EnvelopeCurve},
        filter::{FilterType, ResonantFilter},
        guard::sanitize,
        modulate::{bipolar_to_unipolar, block_average},
        oscillator::{OscillatorBlock, Waveform},
    },
    effects::{Effect, EffectType},
    error::PatchError,
    MAX_BLOCK_SIZE,
};

use self::params::{ParamSet, ParamSpec};

/// Stable identity of a module within a patch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Output channels exposed by the widest module kind.
pub const MAX_OUTPUTS: usize = 2;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    Oscillator,
    Filter,
    Envelope,
    Lfo,
    Effect,
}

impl ModuleType {
    pub fn name(self) -> &'static str {
        match self {
            ModuleType::Oscillator => "oscillator",
            ModuleType::Filter => "filter",
            ModuleType::Envelope => "envelope",
            ModuleType::Lfo => "lfo",
            ModuleType::Effect => "effect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            ModuleType::Oscillator,
            ModuleType::Filter,
            ModuleType::Envelope,
            ModuleType::Lfo,
            ModuleType::Effect,
        ]
        .into_iter()
        .find(|t| t.name() == name)
    }
}

/// Module kind plus its waveform / response / curve / algorithm.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleShape {
    Oscillator(Waveform),
    Filter(FilterType),
    Envelope(EnvelopeCurve),
    Lfo(Waveform),
    Effect(EffectType),
}

impl ModuleShape {
    pub fn module_type(self) -> ModuleType {
        match self {
            ModuleShape::Oscillator(_) => ModuleType::Oscillator,
            ModuleShape::Filter(_) => ModuleType::Filter,
            ModuleShape::Envelope(_) => ModuleType::Envelope,
            ModuleShape::Lfo(_) => ModuleType::Lfo,
            ModuleShape::Effect(_) => ModuleType::Effect,
        }
    }

    pub fn shape_name(self) -> &'static str {
        match self {
            ModuleShape::Oscillator(w) | ModuleShape::Lfo(w) => w.name(),
            ModuleShape::Filter(f) => f.name(),
            ModuleShape::Envelope(c) => c.name(),
            ModuleShape::Effect(e) => e.name(),
        }
    }

    /// Parse a `(type, shape)` name pair as exported in a topology.
    pub fn from_names(module_type: &str, shape: &str) -> Result<Self, PatchError> {
        let unknown = |kind: &'static str, name: &str| PatchError::UnknownShape {
            kind,
            name: name.to_string(),
        };
        let module_type =
            ModuleType::from_name(module_type).ok_or_else(|| unknown("module type", module_type))?;
        match module_type {
            ModuleType::Oscillator => Waveform::from_name(shape)
                .map(ModuleShape::Oscillator)
                .ok_or_else(|| unknown("waveform", shape)),
            ModuleType::Lfo => Waveform::from_name(shape)
                .map(ModuleShape::Lfo)
                .ok_or_else(|| unknown("waveform", shape)),
            ModuleType::Filter => FilterType::from_name(shape)
                .map(ModuleShape::Filter)
                .ok_or_else(|| unknown("filter type", shape)),
            ModuleType::Envelope => EnvelopeCurve::from_name(shape)
                .map(ModuleShape::Envelope)
                .ok_or_else(|| unknown("envelope curve", shape)),
            ModuleType::Effect => EffectType::from_name(shape)
                .map(ModuleShape::Effect)
                .ok_or_else(|| unknown("effect", shape)),
        }
    }

    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            ModuleShape::Oscillator(_) => &oscillator::PARAMS,
            ModuleShape::Filter(_) => &filter::PARAMS,
            ModuleShape::Envelope(_) => &envelope::PARAMS,
            ModuleShape::Lfo(_) => &lfo::PARAMS,
            ModuleShape::Effect(e) => e.params(),
        }
    }

    pub fn output_count(self) -> usize {
        match self {
            ModuleShape::Envelope(_) | ModuleShape::Lfo(_) => 2,
            _ => 1,
        }
    }

    /// LFOs and envelopes run in the control pass, before any audio.
    pub fn is_control_rate(self) -> bool {
        matches!(self, ModuleShape::Envelope(_) | ModuleShape::Lfo(_))
    }
}

/// Static description of a module: what a patch stores and a voice snapshots.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    pub id: ModuleId,
    pub shape: ModuleShape,
    pub params: ParamSet,
}

impl ModuleSpec {
    pub fn new(id: ModuleId, shape: ModuleShape) -> Self {
        Self {
            id,
            shape,
            params: ParamSet::new(shape.params()),
        }
    }

    /// Set a parameter by name. Returns the clamped value that was stored.
    pub fn set_param(&mut self, name: &str, value: f32) -> Result<f32, PatchError> {
        let index = self.param_index(name)?;
        Ok(self.params.set_base(index, value))
    }

    pub fn param_index(&self, name: &str) -> Result<usize, PatchError> {
        self.params
            .index_of(name)
            .ok_or_else(|| PatchError::UnknownParameter {
                module: self.id,
                name: name.to_string(),
            })
    }
}

enum ModuleState {
    Oscillator(OscillatorBlock),
    Filter(ResonantFilter),
    Envelope { env: Envelope, levels: Vec<f32> },
    Lfo { osc: OscillatorBlock, values: Vec<f32> },
    Effect(Effect),
}

impl ModuleState {
    fn new(shape: ModuleShape, sample_rate: f32) -> Self {
        match shape {
            ModuleShape::Oscillator(w) => ModuleState::Oscillator(OscillatorBlock::new(w)),
            ModuleShape::Filter(f) => ModuleState::Filter(ResonantFilter::new(f)),
            ModuleShape::Envelope(curve) => ModuleState::Envelope {
                env: Envelope::default().with_curve(curve),
                levels: vec![0.0; MAX_BLOCK_SIZE],
            },
            ModuleShape::Lfo(w) => ModuleState::Lfo {
                osc: OscillatorBlock::new(w),
                values: vec![0.0; MAX_BLOCK_SIZE],
            },
            ModuleShape::Effect(e) => ModuleState::Effect(Effect::new(e, sample_rate)),
        }
    }

    fn reset(&mut self) {
        match self {
            ModuleState::Oscillator(osc) => osc.reset(),
            ModuleState::Filter(filter) => filter.reset(),
            ModuleState::Envelope { env, .. } => env.reset(),
            ModuleState::Lfo { osc, .. } => osc.reset(),
            ModuleState::Effect(effect) => effect.reset(),
        }
    }
}

/// Runtime module: parameters plus continuous DSP state.
pub struct Module {
    id: ModuleId,
    shape: ModuleShape,
    params: ParamSet,
    state: ModuleState,
    outputs: [f32; MAX_OUTPUTS],
    frames: usize,
}

impl Module {
    /// Build fresh state for `spec`. Allocates; call off the render path
    /// where possible.
    pub fn instantiate(spec: &ModuleSpec, sample_rate: f32) -> Self {
        Self {
            id: spec.id,
            shape: spec.shape,
            params: spec.params,
            state: ModuleState::new(spec.shape, sample_rate),
            outputs: [0.0; MAX_OUTPUTS],
            frames: 0,
        }
    }

    /// Reuse this module's memory for `spec`. Returns false when the shapes
    /// differ and the module must be re-instantiated instead.
    pub fn reset_from(&mut self, spec: &ModuleSpec) -> bool {
        if self.shape != spec.shape {
            return false;
        }
        self.id = spec.id;
        self.params = spec.params;
        self.reset();
        true
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.outputs = [0.0; MAX_OUTPUTS];
        self.frames = 0;
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn shape(&self) -> ModuleShape {
        self.shape
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    pub fn is_control_rate(&self) -> bool {
        self.shape.is_control_rate()
    }

    /// Last block's value on output channel `channel`.
    #[inline]
    pub fn output(&self, channel: usize) -> f32 {
        self.outputs.get(channel).copied().unwrap_or(0.0)
    }

    pub fn note_on(&mut self, ctx: &RenderCtx) {
        if let ModuleState::Envelope { env, .. } = &mut self.state {
            env.note_on(ctx);
        }
    }

    pub fn note_off(&mut self, ctx: &RenderCtx) {
        if let ModuleState::Envelope { env, .. } = &mut self.state {
            env.note_off(ctx);
        }
    }

    /// `Some(finished)` for envelopes, `None` for every other kind.
    pub fn envelope_finished(&self) -> Option<bool> {
        match &self.state {
            ModuleState::Envelope { env, .. } => Some(env.is_finished()),
            _ => None,
        }
    }

    /// Control pass: advance an LFO or envelope by `frames` and publish its
    /// block outputs. Audio-rate modules ignore this.
    pub fn advance_control(&mut self, frames: usize, ctx: &RenderCtx) {
        let frames = frames.min(MAX_BLOCK_SIZE);
        self.frames = frames;
        match &mut self.state {
            ModuleState::Envelope { env, levels } => {
                let level = envelope::advance(env, &self.params, &mut levels[..frames], ctx);
                self.outputs = [level, 1.0 - level];
            }
            ModuleState::Lfo { osc, values } => {
                let value =
                    lfo::advance(osc, &self.params, &mut values[..frames], ctx.sample_rate);
                self.outputs = [value, bipolar_to_unipolar(value)];
            }
            _ => {}
        }
    }

    /// Audio pass: run this module over the voice buffer.
    pub fn process_audio(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        match &mut self.state {
            ModuleState::Oscillator(osc) => {
                self.outputs[0] = oscillator::process(osc, &self.params, buffer, ctx);
            }
            ModuleState::Filter(filter) => {
                filter::process(filter, &self.params, buffer, ctx);
            }
            ModuleState::Envelope { levels, .. } => {
                let n = buffer.len().min(self.frames);
                envelope::apply_vca(&levels[..n], &self.params, &mut buffer[..n], ctx);
            }
            ModuleState::Lfo { values, .. } => {
                let n = buffer.len().min(self.frames);
                lfo::apply_audio(&values[..n], &self.params, &mut buffer[..n]);
            }
            ModuleState::Effect(effect) => {
                effect.process(&self.params, buffer, ctx.sample_rate);
            }
        }

        sanitize(buffer);
        if matches!(self.shape, ModuleShape::Filter(_) | ModuleShape::Effect(_)) {
            self.outputs[0] = block_average(buffer);
        }
    }

    /// Effects-chain entry point; effects there are never modulated.
    pub fn process_effect(&mut self, buffer: &mut [f32], sample_rate: f32) {
        if let ModuleState::Effect(effect) = &mut self.state {
            effect.process(&self.params, buffer, sample_rate);
            self.outputs[0] = block_average(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn ctx() -> RenderCtx {
        RenderCtx::from_freq(SAMPLE_RATE, 440.0, 1.0)
    }

    #[test]
    fn shape_names_round_trip() {
        let shapes = [
            ModuleShape::Oscillator(Waveform::Saw),
            ModuleShape::Filter(FilterType::Notch),
            ModuleShape::Envelope(EnvelopeCurve::Exponential),
            ModuleShape::Lfo(Waveform::Triangle),
            ModuleShape::Effect(EffectType::RingMod),
        ];
        for shape in shapes {
            let parsed = ModuleShape::from_names(shape.module_type().name(), shape.shape_name());
            assert_eq!(parsed, Ok(shape));
        }
    }

    #[test]
    fn unknown_shape_is_an_unknown_reference() {
        let err = ModuleShape::from_names("oscillator", "noise").unwrap_err();
        assert!(err.is_unknown_reference());
        assert!(ModuleShape::from_names("sampler", "sine").is_err());
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut spec = ModuleSpec::new(ModuleId(3), ModuleShape::Filter(FilterType::LowPass));
        assert_eq!(spec.set_param("cutoff", 1.0e6), Ok(20_000.0));
        assert_eq!(
            spec.set_param("q", 1.0),
            Err(PatchError::UnknownParameter {
                module: ModuleId(3),
                name: "q".to_string()
            })
        );
    }

    #[test]
    fn envelope_outputs_level_and_inverse() {
        let spec = ModuleSpec::new(ModuleId(1), ModuleShape::Envelope(EnvelopeCurve::Linear));
        let mut module = Module::instantiate(&spec, SAMPLE_RATE);
        module.note_on(&ctx());
        module.advance_control(256, &ctx());
        let level = module.output(0);
        assert!(level > 0.0 && level < 1.0);
        assert!((module.output(1) - (1.0 - level)).abs() < 1e-6);
        assert_eq!(module.output(5), 0.0);
    }

    #[test]
    fn lfo_stays_out_of_audio_until_level_is_raised() {
        let spec = ModuleSpec::new(ModuleId(1), ModuleShape::Lfo(Waveform::Square));
        let mut module = Module::instantiate(&spec, SAMPLE_RATE);
        module.advance_control(64, &ctx());
        let mut buffer = [0.0f32; 64];
        module.process_audio(&mut buffer, &ctx());
        assert!(buffer.iter().all(|&s| s == 0.0));

        module.params_mut().set_base(lfo::LEVEL, 0.5);
        module.advance_control(64, &ctx());
        module.process_audio(&mut buffer, &ctx());
        assert!(buffer.iter().all(|&s| (s.abs() - 0.5).abs() < 1e-6));
    }

    #[test]
    fn reset_from_reuses_matching_shape_only() {
        let osc = ModuleSpec::new(ModuleId(1), ModuleShape::Oscillator(Waveform::Sine));
        let mut module = Module::instantiate(&osc, SAMPLE_RATE);
        let mut buffer = [0.0f32; 32];
        module.process_audio(&mut buffer, &ctx());

        let mut louder = osc.clone();
        louder.set_param("gain", 0.25).unwrap();
        assert!(module.reset_from(&louder));
        assert_eq!(module.params().base(oscillator::GAIN), 0.25);

        let filter = ModuleSpec::new(ModuleId(2), ModuleShape::Filter(FilterType::LowPass));
        assert!(!module.reset_from(&filter));
    }
}
