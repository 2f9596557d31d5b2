//! Numeric hygiene at module boundaries.
//!
//! A filter pushed into a pathological feedback state, or a delay fed a NaN,
//! must not poison the whole mix. Every module output passes through
//! [`sanitize`] before the next stage sees it.

/// Anything smaller than this is treated as silence.
pub const DENORMAL_THRESHOLD: f32 = 1.0e-20;

#[inline]
pub fn flush_denormal(sample: f32) -> f32 {
    if sample.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        sample
    }
}

/// Replace NaN/∞ with silence and flush denormals.
#[inline]
pub fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() {
        flush_denormal(sample)
    } else {
        0.0
    }
}

/// Sanitize a block in place. Returns true if a non-finite value was found.
pub fn sanitize(buffer: &mut [f32]) -> bool {
    let mut faulted = false;
    for sample in buffer.iter_mut() {
        if !sample.is_finite() {
            faulted = true;
        }
        *sample = sanitize_sample(*sample);
    }
    faulted
}

/// Peak absolute value of a block.
#[inline]
pub fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}
