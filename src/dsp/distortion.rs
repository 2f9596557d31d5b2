//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. The "drive" parameter
//! controls how aggressively the signal is pushed into the nonlinear region.
//!
//! # How Waveshaping Works
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * drive)
//!
//! When drive is low (1.0), the signal stays in the linear region of f()
//! and passes through mostly unchanged. As drive increases, the signal hits
//! the nonlinear parts of f(), creating harmonic distortion.
//!
//! # Transfer Functions
//!
//! Saturation (tanh):
//!   f(x) = tanh(x)
//!   - Smooth, symmetric, odd harmonics only
//!   - Output bounded to (-1, 1) for any drive
//!
//! Soft Clip:
//!   f(x) = x / (1 + |x|)
//!   - Cheaper cousin of tanh with a gentler knee
//!
//! Hard Clip:
//!   f(x) = clamp(x, -threshold, threshold)
//!   - Harsh, buzzy, think guitar fuzz pedal
//!
//! Wavefold:
//!   When x exceeds ±1 it reflects back toward zero, as many times as needed.
//!   Closed form (triangle wave of period 4):
//!
//! ```text
//! y = 1 − 4 · | frac((x + 1) / 4) − 0.5 |
//! ```
//!
//!   Identity on [-1, 1]; 1.4 folds to 0.6; 3.0 folds to -1.0.
//!   No loop, so a huge drive cannot stall the render thread.
//!
//! Bit reduction:
//!   Quantise to 2^bits levels across [-1, 1]:  step = 2 / 2^bits
//!
//! # Drive Values
//!
//!   1.0  = Clean
//!   2-4  = Warm saturation
//!   5-10 = Obvious distortion
//!   10+  = Heavy, aggressive

/// `tanh` saturation.
#[inline]
pub fn saturate(sample: f32, drive: f32) -> f32 {
    (sample * drive).tanh()
}

/// Soft clipping using x / (1 + |x|).
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

#[inline]
pub fn hard_clip(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;
    x.clamp(-threshold, threshold)
}

/// Triangular reflection at ±1.
#[inline]
pub fn wavefold(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    if !x.is_finite() {
        return 0.0;
    }
    let t = (x + 1.0) * 0.25;
    1.0 - 4.0 * (t - t.floor() - 0.5).abs()
}

/// Quantise a sample in [-1, 1] to `bits` of resolution.
#[inline]
pub fn quantize(sample: f32, bits: f32) -> f32 {
    let levels = 2f32.powf(bits.clamp(1.0, 24.0));
    let step = 2.0 / levels;
    (sample / step).round() * step
}

/// Dry/wet blend.
#[inline]
pub fn mix(dry: f32, wet: f32, amount: f32) -> f32 {
    dry + (wet - dry) * amount
}

pub fn saturate_buffer(buffer: &mut [f32], drive: f32) {
    for sample in buffer.iter_mut() {
        *sample = saturate(*sample, drive);
    }
}

pub fn wavefold_buffer(buffer: &mut [f32], drive: f32) {
    for sample in buffer.iter_mut() {
        *sample = wavefold(*sample, drive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_clip_unity_drive() {
        // f(0.1) = 0.1 / 1.1 ≈ 0.0909
        assert!((soft_clip(0.1, 1.0) - 0.0909).abs() < 0.01);
    }

    #[test]
    fn test_saturate_is_bounded() {
        for &drive in &[1.0, 10.0, 1.0e6] {
            let y = saturate(1.0, drive);
            assert!(y > 0.0 && y <= 1.0, "drive {drive} gave {y}");
        }
        assert!((saturate(0.01, 1.0) - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_hard_clip_above_threshold() {
        assert!((hard_clip(0.8, 2.0, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wavefold_identity_inside_unit_range() {
        for &x in &[-1.0, -0.5, 0.0, 0.3, 0.99] {
            assert!((wavefold(x, 1.0) - x).abs() < 1e-5, "fold({x}) = {}", wavefold(x, 1.0));
        }
    }

    #[test]
    fn test_wavefold_reflects() {
        // 0.7 * 2 = 1.4, folds to 0.6
        assert!((wavefold(0.7, 2.0) - 0.6).abs() < 1e-5);
        assert!((wavefold(3.0, 1.0) + 1.0).abs() < 1e-5);
        assert!((wavefold(-1.4, 1.0) + 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_wavefold_huge_drive_stays_bounded() {
        let y = wavefold(0.9, 1.0e9);
        assert!((-1.0..=1.0).contains(&y));
        assert_eq!(wavefold(1.0, f32::INFINITY), 0.0);
    }

    #[test]
    fn test_quantize_to_step() {
        // 2 bits -> 4 levels, step 0.5
        assert_eq!(quantize(0.3, 2.0), 0.5);
        assert_eq!(quantize(0.2, 2.0), 0.0);
        assert_eq!(quantize(-0.8, 2.0), -1.0);
    }

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(mix(0.2, 0.8, 0.0), 0.2);
        assert!((mix(0.2, 0.8, 1.0) - 0.8).abs() < 1e-6);
    }
}
