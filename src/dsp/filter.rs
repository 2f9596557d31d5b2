use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | far from it  |
| notch / band-stop | far from cutoff | around it    |

Biquad (RBJ cookbook)
=====================

A second-order IIR section, transposed direct form II:

    y  = b0·x + z1
    z1 = b1·x − a1·y + z2
    z2 = b2·x − a2·y

Coefficients come from the bilinear transform of the analog prototypes:

    w0    = 2π · cutoff / sample_rate
    alpha = sin(w0) / (2Q)

    low-pass    b = [(1−cos)/2, 1−cos, (1−cos)/2]
    high-pass   b = [(1+cos)/2, −(1+cos), (1+cos)/2]
    band-pass   b = [alpha, 0, −alpha]                 (0 dB peak gain)
    notch       b = [1, −2cos, 1]
    all         a = [1+alpha, −2cos, 1−alpha]          (normalised by a0)

Shelving and peaking sections for the equaliser use the same structure with
A = 10^(gain_db / 40).

Stability
---------

The poles stay inside the unit circle as long as 0 < w0 < π and Q > 0.
Cutoff is clamped to [10 Hz, 0.49·sample_rate] and Q to [0.1, 24] before
design, so no parameter combination can make the section blow up. The math
runs in f64 because single-precision coefficients for low cutoffs at high
sample rates lose enough precision to drift the poles.

Resonance → Q
-------------

The user-facing resonance in [0, 1] maps exponentially onto Q:

    Q = 0.707 · (24 / 0.707) ^ resonance

0 gives a Butterworth response (no peak), 1 a sharp self-ringing peak.
*/

pub const MIN_CUTOFF_HZ: f32 = 10.0;
pub const MAX_CUTOFF_RATIO: f32 = 0.49;
pub const MIN_Q: f32 = 0.1;
pub const MAX_Q: f32 = 24.0;
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

impl FilterType {
    pub const ALL: [FilterType; 4] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::Notch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterType::LowPass => "lowpass",
            FilterType::HighPass => "highpass",
            FilterType::BandPass => "bandpass",
            FilterType::Notch => "notch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Clamp a cutoff so the design stays below Nyquist.
#[inline]
pub fn clamp_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let max = (MAX_CUTOFF_RATIO * sample_rate).max(MIN_CUTOFF_HZ);
    if cutoff_hz.is_nan() {
        return MIN_CUTOFF_HZ;
    }
    cutoff_hz.clamp(MIN_CUTOFF_HZ, max)
}

#[inline]
pub fn clamp_q(q: f32) -> f32 {
    if q.is_nan() {
        return BUTTERWORTH_Q;
    }
    q.clamp(MIN_Q, MAX_Q)
}

/// Map a resonance amount in [0, 1] onto Q.
#[inline]
pub fn resonance_to_q(resonance: f32) -> f32 {
    let r = resonance.clamp(0.0, 1.0);
    BUTTERWORTH_Q * (MAX_Q / BUTTERWORTH_Q).powf(r)
}

/// Normalised biquad coefficients (a0 = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalised(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn omega(cutoff_hz: f32, sample_rate: f32) -> (f64, f64) {
        let w0 = TAU * clamp_cutoff(cutoff_hz, sample_rate) as f64 / sample_rate as f64;
        (w0.sin(), w0.cos())
    }

    pub fn design(filter_type: FilterType, cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let (sin, cos) = Self::omega(cutoff_hz, sample_rate);
        let alpha = sin / (2.0 * clamp_q(q) as f64);
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos;
        let a2 = 1.0 - alpha;

        match filter_type {
            FilterType::LowPass => {
                let b1 = 1.0 - cos;
                Self::normalised(b1 / 2.0, b1, b1 / 2.0, a0, a1, a2)
            }
            FilterType::HighPass => {
                let b1 = 1.0 + cos;
                Self::normalised(b1 / 2.0, -b1, b1 / 2.0, a0, a1, a2)
            }
            FilterType::BandPass => Self::normalised(alpha, 0.0, -alpha, a0, a1, a2),
            FilterType::Notch => Self::normalised(1.0, -2.0 * cos, 1.0, a0, a1, a2),
        }
    }

    pub fn low_shelf(cutoff_hz: f32, gain_db: f32, sample_rate: f32) -> Self {
        let (sin, cos) = Self::omega(cutoff_hz, sample_rate);
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let alpha = sin / 2.0 * 2f64.sqrt();
        let sqrt_a2 = 2.0 * a.sqrt() * alpha;

        Self::normalised(
            a * ((a + 1.0) - (a - 1.0) * cos + sqrt_a2),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
            a * ((a + 1.0) - (a - 1.0) * cos - sqrt_a2),
            (a + 1.0) + (a - 1.0) * cos + sqrt_a2,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos),
            (a + 1.0) + (a - 1.0) * cos - sqrt_a2,
        )
    }

    pub fn high_shelf(cutoff_hz: f32, gain_db: f32, sample_rate: f32) -> Self {
        let (sin, cos) = Self::omega(cutoff_hz, sample_rate);
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let alpha = sin / 2.0 * 2f64.sqrt();
        let sqrt_a2 = 2.0 * a.sqrt() * alpha;

        Self::normalised(
            a * ((a + 1.0) + (a - 1.0) * cos + sqrt_a2),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
            a * ((a + 1.0) + (a - 1.0) * cos - sqrt_a2),
            (a + 1.0) - (a - 1.0) * cos + sqrt_a2,
            2.0 * ((a - 1.0) - (a + 1.0) * cos),
            (a + 1.0) - (a - 1.0) * cos - sqrt_a2,
        )
    }

    pub fn peaking(center_hz: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let (sin, cos) = Self::omega(center_hz, sample_rate);
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let alpha = sin / (2.0 * clamp_q(q) as f64);

        Self::normalised(
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Biquad {
    coefficients: BiquadCoefficients,
    z1: f64,
    z2: f64,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new(BiquadCoefficients::IDENTITY)
    }
}

impl Biquad {
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        Self::new(BiquadCoefficients::design(
            FilterType::LowPass,
            cutoff_hz,
            q,
            sample_rate,
        ))
    }

    pub fn highpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        Self::new(BiquadCoefficients::design(
            FilterType::HighPass,
            cutoff_hz,
            q,
            sample_rate,
        ))
    }

    /// Swap coefficients, keeping the delay registers so the output stays continuous.
    pub fn set_coefficients(&mut self, coefficients: BiquadCoefficients) {
        self.coefficients = coefficients;
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        let c = &self.coefficients;
        let x = sample as f64;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;

        // Registers decay geometrically to denormals on silence
        if self.z1.abs() < 1e-30 {
            self.z1 = 0.0;
        }
        if self.z2.abs() < 1e-30 {
            self.z2 = 0.0;
        }
        y as f32
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Biquad that remembers the settings it was designed for and only
/// recomputes coefficients when they change.
#[derive(Debug, Clone)]
pub struct ResonantFilter {
    filter_type: FilterType,
    biquad: Biquad,
    designed_for: Option<(f32, f32, f32)>,
}

impl ResonantFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            filter_type,
            biquad: Biquad::default(),
            designed_for: None,
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Design for the given cutoff and resonance if they differ from the
    /// current design.
    pub fn configure(&mut self, cutoff_hz: f32, resonance: f32, sample_rate: f32) {
        let key = (cutoff_hz, resonance, sample_rate);
        if self.designed_for == Some(key) {
            return;
        }
        self.biquad.set_coefficients(BiquadCoefficients::design(
            self.filter_type,
            cutoff_hz,
            resonance_to_q(resonance),
            sample_rate,
        ));
        self.designed_for = Some(key);
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        self.biquad.render(buffer);
    }

    pub fn reset(&mut self) {
        self.biquad.reset();
    }
}
