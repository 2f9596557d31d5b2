//! Phase-accumulator oscillator shared by audio oscillators and LFOs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f64::consts::TAU;

/*
Phase Accumulator
=================

Every periodic waveform here is a function of a normalised phase in [0, 1).
Each frame the phase advances by the frequency expressed in cycles per
sample and wraps:

    phase += freq / sample_rate      (mod 1.0)

At 440 Hz and 48 kHz the increment is 0.009166…, so one period lasts
48000 / 440 ≈ 109.09 frames. The phase is kept in f64 so long notes do not
drift audibly.

Waveforms
---------

    sine       sin(2π·phase)
    square     +1 while phase < duty, else −1   (duty 0.5 = symmetric)
    saw        2·phase − 1                       (rising ramp)
    triangle   1 − 4·|phase − 0.5|               (folded ramp)

      sine        square       saw         triangle
     ╭─╮         ┌──┐         ╱│  ╱│      ╲    ╱
    ╯   ╰  ╭     │  │  ┌    ╱  │╱  │       ╲  ╱
         ╰─╯     ┘  └──┘                    ╲╱

Sine, saw and triangle have zero mean over a full period. The square wave
has zero mean only at duty 0.5.

The waveforms are naive (not band-limited). Saw and square alias at high
pitches; the low-pass that usually follows in a subtractive patch keeps this
tolerable.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Saw,
        Waveform::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Saw => "saw",
            Waveform::Triangle => "triangle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.name() == name)
    }

    /// Waveform value at a normalised phase in [0, 1).
    #[inline]
    pub fn value_at(self, phase: f64, duty: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin() as f32,
            Waveform::Square => {
                if phase < duty as f64 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => (2.0 * phase - 1.0) as f32,
            Waveform::Triangle => (1.0 - 4.0 * (phase - 0.5).abs()) as f32,
        }
    }
}

pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f64,
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    pub fn square() -> Self {
        Self::new(Waveform::Square)
    }

    pub fn sawtooth() -> Self {
        Self::new(Waveform::Saw)
    }

    pub fn triangle() -> Self {
        Self::new(Waveform::Triangle)
    }

    /// Produce the current sample, then advance the phase by one frame.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32, duty: f32) -> f32 {
        let value = self.waveform.value_at(self.phase, duty);
        self.phase += frequency as f64 / sample_rate as f64;
        self.phase -= self.phase.floor();
        value
    }

    /// Overwrite `out` with oscillator output.
    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32, duty: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate, duty);
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
