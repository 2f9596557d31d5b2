//! Named, bounded parameters.
//!
//! Every module kind declares a static table of [`ParamSpec`]s. A module
//! instance carries a [`ParamSet`]: the base value the user set for every
//! parameter plus the effective value the router produced for the current
//! block. Values are stored in fixed arrays, so a `ParamSet` is `Copy` and
//! never allocates.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::modulate::{exponential_scale, linear_offset};

/// Upper bound on parameters per module kind.
pub const MAX_PARAMS: usize = 8;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamCurve {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub curve: ParamCurve,
}

impl ParamSpec {
    pub const fn linear(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            min,
            max,
            default,
            curve: ParamCurve::Linear,
        }
    }

    /// `min` must be positive.
    pub const fn exponential(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            min,
            max,
            default,
            curve: ParamCurve::Exponential,
        }
    }

    /// Clamp into range. NaN resolves to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Effective value for a summed modulation amount.
    #[inline]
    pub fn modulate(&self, base: f32, amount: f32) -> f32 {
        if amount == 0.0 {
            return self.clamp(base);
        }
        let value = match self.curve {
            ParamCurve::Linear => linear_offset(base, amount, self.min, self.max),
            ParamCurve::Exponential => exponential_scale(base, amount, self.min, self.max),
        };
        self.clamp(value)
    }

    /// Map a 0..1 control position onto the range along this curve.
    pub fn from_normalized(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        let value = match self.curve {
            ParamCurve::Linear => self.min + t * (self.max - self.min),
            ParamCurve::Exponential => self.min * (self.max / self.min).powf(t),
        };
        self.clamp(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSet {
    specs: &'static [ParamSpec],
    base: [f32; MAX_PARAMS],
    effective: [f32; MAX_PARAMS],
}

impl ParamSet {
    pub fn new(specs: &'static [ParamSpec]) -> Self {
        debug_assert!(specs.len() <= MAX_PARAMS);
        let mut base = [0.0; MAX_PARAMS];
        for (slot, spec) in base.iter_mut().zip(specs) {
            *slot = spec.default;
        }
        Self {
            specs,
            base,
            effective: base,
        }
    }

    pub fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    /// Set a base value, clamped. Returns the stored value.
    pub fn set_base(&mut self, index: usize, value: f32) -> f32 {
        let Some(spec) = self.specs.get(index) else {
            return 0.0;
        };
        let value = spec.clamp(value);
        self.base[index] = value;
        self.effective[index] = value;
        value
    }

    pub fn base(&self, index: usize) -> f32 {
        self.base[index]
    }

    /// Effective value for the current block.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.effective[index]
    }

    /// Freeze effective values for this block from summed modulation amounts.
    pub fn apply(&mut self, amounts: &[f32; MAX_PARAMS]) {
        for (i, spec) in self.specs.iter().enumerate() {
            self.effective[i] = spec.modulate(self.base[i], amounts[i]);
        }
    }

    pub fn reset_effective(&mut self) {
        self.effective = self.base;
    }

    /// `(name, base value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.specs
            .iter()
            .zip(self.base.iter())
            .map(|(spec, &value)| (spec.name, value))
    }
}
