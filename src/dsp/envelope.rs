use crate::{module::RenderCtx, MIN_TIME};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope Implementation
============================

The workhorse of amplitude and filter-sweep control.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0).

  stage       Which phase of the envelope we're in. A state machine governs
              transitions: Idle, Attack, Decay, Sustain, Release, Finished.

  gate        The note on/off signal. Gate high (note_on) triggers Attack.
              Gate low (note_off) triggers Release from wherever we are.

  curve       Linear ramps or exponential approach. Both reach the end of a
              stage in the configured time.


The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release
         (A)   (D)      (S)      (R)


Linear: Time to Increment
-------------------------

    increment = target_change / (time_seconds * sample_rate)

Attack of 0.1 s at 48 kHz: 4800 samples, increment = 1 / 4800 ≈ 0.000208.
Attack starts from the CURRENT level, so a retrigger during release ramps up
from where the voice already is instead of clicking down to zero.

Decay always covers the full 1 → S drop in `decay` seconds. Release snapshots
the level at note_off and covers it in `release` seconds.


Exponential: Overshoot Target
-----------------------------

A one-pole filter approaching a target never arrives. To make each stage end
in a finite, configured time, the target is placed slightly BEYOND the stage
end point and the stage is cut when the end point is crossed:

    level = base + level * coef

    attack    target = 1 + ratio_a           ends at level >= 1
    decay     target = S − ratio_dr          ends at level <= S
    release   target = 0 − ratio_dr          ends at level <= 0

The coefficient for a stage of `n` samples is

    coef = exp(−ln((1 + ratio) / ratio) / n)
    base = (target) * (1 − coef)

A large attack ratio (0.3) keeps the attack close to a straight line with a
soft shoulder; a tiny decay/release ratio (0.0001) gives the natural
"RC discharge" tail. Every step moves the level toward the target, so each
stage is monotonic.


The State Machine
-----------------

    ┌──────┐ note_on ┌────────┐ level=1 ┌───────┐ level=S ┌─────────┐
    │ Idle │ ──────→ │ Attack │ ──────→ │ Decay │ ──────→ │ Sustain │
    └──────┘         └────────┘         └───────┘         └─────────┘
        │                 │ note_off        │ note_off         │ note_off
        │ note_off        ↓                 ↓                  ↓
        │            ┌─────────────────────────────────────────────┐
        │            │                   Release                   │
        │            └─────────────────────────────────────────────┘
        │                                 │ level=0
        ↓                                 ↓
    ┌──────────────────────────────────────────┐
    │                Finished                  │ ── note_on ──→ Attack
    └──────────────────────────────────────────┘

Finished differs from Idle only in meaning: it tells the voice that this
envelope has completed a note and the voice may be reclaimed.

Parameters may be updated every block (they are modulation destinations).
Stage coefficients are recomputed from the current parameters each sample;
the release snapshot is taken once at note_off.
*/

const ATTACK_TARGET_RATIO: f32 = 0.3;
const DECAY_RELEASE_TARGET_RATIO: f32 = 0.0001;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeCurve {
    Linear,
    Exponential,
}

impl EnvelopeCurve {
    pub const ALL: [EnvelopeCurve; 2] = [EnvelopeCurve::Linear, EnvelopeCurve::Exponential];

    pub fn name(self) -> &'static str {
        match self {
            EnvelopeCurve::Linear => "linear",
            EnvelopeCurve::Exponential => "exponential",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One-pole coefficient that covers the full stage in `samples` frames.
#[inline]
fn stage_coef(samples: f32, ratio: f32) -> f32 {
    (-((1.0 + ratio) / ratio).ln() / samples.max(1.0)).exp()
}

#[derive(Debug, Clone)]
pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,
    curve: EnvelopeCurve,

    stage: EnvelopeStage,
    level: f32,

    // Linear release bookkeeping, snapshotted at note_off
    release_step: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::adsr(0.01, 0.1, 0.7, 0.3)
    }
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self {
            attack_time: MIN_TIME,
            decay_time: MIN_TIME,
            sustain_level: 0.0,
            release_time: MIN_TIME,
            curve: EnvelopeCurve::Linear,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            release_step: 0.0,
        };
        env.set_adsr(attack, decay, sustain, release);
        env
    }

    pub fn with_curve(mut self, curve: EnvelopeCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Update the stage times and sustain level. Safe to call every block.
    pub fn set_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack_time = attack.max(MIN_TIME);
        self.decay_time = decay.max(MIN_TIME);
        self.sustain_level = sustain.clamp(0.0, 1.0);
        self.release_time = release.max(MIN_TIME);
    }

    /// Gate high: attack from the current level.
    pub fn note_on(&mut self, _ctx: &RenderCtx) {
        self.stage = EnvelopeStage::Attack;
    }

    /// Gate low: release from the current level.
    pub fn note_off(&mut self, ctx: &RenderCtx) {
        match self.stage {
            EnvelopeStage::Idle => {
                self.stage = EnvelopeStage::Finished;
            }
            EnvelopeStage::Release | EnvelopeStage::Finished => {}
            _ => {
                let samples = (self.release_time * ctx.sample_rate).max(1.0);
                self.release_step = self.level / samples;
                self.stage = EnvelopeStage::Release;
            }
        }
    }

    /// Advance the envelope by one sample and return the new level.
    pub fn next_sample(&mut self, ctx: &RenderCtx) -> f32 {
        let sr = ctx.sample_rate;
        match self.stage {
            EnvelopeStage::Idle | EnvelopeStage::Finished => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                let samples = self.attack_time * sr;
                self.level = match self.curve {
                    EnvelopeCurve::Linear => self.level + 1.0 / samples.max(1.0),
                    EnvelopeCurve::Exponential => {
                        let coef = stage_coef(samples, ATTACK_TARGET_RATIO);
                        let target = 1.0 + ATTACK_TARGET_RATIO;
                        target * (1.0 - coef) + self.level * coef
                    }
                };

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                let target = self.sustain_level;
                let samples = self.decay_time * sr;
                self.level = match self.curve {
                    EnvelopeCurve::Linear => self.level - (1.0 - target) / samples.max(1.0),
                    EnvelopeCurve::Exponential => {
                        let coef = stage_coef(samples, DECAY_RELEASE_TARGET_RATIO);
                        let overshoot = target - DECAY_RELEASE_TARGET_RATIO;
                        overshoot * (1.0 - coef) + self.level * coef
                    }
                };

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeStage::Release => {
                self.level = match self.curve {
                    EnvelopeCurve::Linear => self.level - self.release_step,
                    EnvelopeCurve::Exponential => {
                        let coef =
                            stage_coef(self.release_time * sr, DECAY_RELEASE_TARGET_RATIO);
                        -DECAY_RELEASE_TARGET_RATIO * (1.0 - coef) + self.level * coef
                    }
                };

                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Finished;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope levels into the buffer.
    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(ctx);
        }
    }

    /// Advance `frames` samples without writing them anywhere.
    pub fn advance(&mut self, frames: usize, ctx: &RenderCtx) {
        for _ in 0..frames {
            self.next_sample(ctx);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stage == EnvelopeStage::Finished
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.release_step = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}
