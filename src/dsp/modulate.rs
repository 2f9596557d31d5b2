//! Parameter modulation primitives.

/*
Parameter Modulation
====================

Modulation is using one signal to continuously vary a parameter of another.
In the patch, every connection carries a depth in [-1, +1] and every
parameter declares a range and a scaling curve. The router sums the
weighted sources for a destination once per block:

    amount = Σ depth × source_output

and hands `amount` to the parameter, which turns it into a value:

    linear       effective = base + amount × (max − min)
    exponential  effective = base × (max / min) ^ amount

and finally clamps into [min, max].


Why Two Curves
--------------

Pitch-like and time-like quantities are perceived on a log scale. An LFO
sweeping a cutoff linearly from 200 Hz to 5 kHz spends almost all of its
cycle in the top octaves. With the exponential curve, depth = 0.1 on a
20 Hz..20 kHz cutoff moves the cutoff by 10 ^ (3 × 0.1) ≈ ×2, one octave,
regardless of where the base sits.

Linear parameters (mix, gain, sustain level, semitone offsets) simply get
a fraction of their span added.


Block-Rate Modulation
---------------------

Parameters are frozen for the whole block. Control sources (LFO, envelope)
report the average of the block they just produced; audio-rate sources
(oscillator, filter, effect) report the average of their previous block.
For an LFO at 5 Hz with 256-frame blocks at 48 kHz there are ~37 updates per
cycle, which is plenty smooth for filter sweeps and vibrato.

    A ─────┐        ┌──── one value per block
           ▼        ▼
        [ LFO ] ─→ avg ─→ Σ depth ─→ curve ─→ clamp ─→ cutoff

Unipolar sources (envelope level, LFO channel 1) only push a parameter in
one direction; bipolar sources (LFO channel 0) swing it both ways.
*/

use crate::dsp::guard::flush_denormal;

/// Average of a block of samples. Zero for an empty block.
///
/// Used for block-rate modulation: one value represents the entire block.
#[inline]
pub fn block_average(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    flush_denormal(samples.iter().sum::<f32>() / samples.len() as f32)
}

/// Linear modulation: the amount is a fraction of the parameter span.
#[inline]
pub fn linear_offset(base: f32, amount: f32, min: f32, max: f32) -> f32 {
    base + amount * (max - min)
}

/// Exponential modulation: the amount is a fraction of the span in octaves
/// (more precisely, in powers of `max / min`).
///
/// `min` must be positive.
#[inline]
pub fn exponential_scale(base: f32, amount: f32, min: f32, max: f32) -> f32 {
    base * (max / min).powf(amount)
}

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}
