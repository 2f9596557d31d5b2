//! Dynamics: level detection and the compressor gain computer.

/*
Compressor
==========

    input ──┬────────────────────────────────(×)──→ output
            │                                  ↑
            └→ |x| → dB → [ peak follower ] → [ gain computer ] → dB → lin

Peak follower (in dB, one-pole with separate attack and release):

    coef = exp(−1 / (time_s · sample_rate))
    env  = coef · env + (1 − coef) · level_db

attack applies while the level is above the envelope, release otherwise.

Gain computer (soft knee of width W around threshold T, ratio R):

    x < T − W/2            y = x
    |x − T| ≤ W/2          y = x + (1/R − 1) · (x − T + W/2)² / (2W)
    x > T + W/2            y = T + (x − T) / R

reduction = x − y, applied as a negative gain plus make-up.
*/

/// Silence floor for dB conversions.
pub const SILENCE_DB: f32 = -100.0;

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear < 1e-5 {
        SILENCE_DB
    } else {
        20.0 * linear.log10()
    }
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
#[inline]
pub fn time_coef(ms: f32, sample_rate: f32) -> f32 {
    let samples = (ms / 1000.0 * sample_rate).max(1.0);
    (-1.0 / samples).exp()
}

/// Static curve: output level in dB for an input level in dB.
#[inline]
pub fn gain_computer(input_db: f32, threshold_db: f32, ratio: f32, knee_db: f32) -> f32 {
    let ratio = ratio.max(1.0);
    let over = input_db - threshold_db;
    if knee_db > 0.0 && 2.0 * over.abs() <= knee_db {
        let x = over + knee_db / 2.0;
        input_db + (1.0 / ratio - 1.0) * x * x / (2.0 * knee_db)
    } else if over > 0.0 {
        threshold_db + over / ratio
    } else {
        input_db
    }
}

#[derive(Debug, Clone)]
pub struct Compressor {
    envelope_db: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-block compressor settings.
#[derive(Debug, Clone, Copy)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_coef: f32,
    pub release_coef: f32,
    pub makeup_db: f32,
    pub knee_db: f32,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            envelope_db: SILENCE_DB,
        }
    }

    /// Gain reduction in dB (non-negative) currently applied.
    pub fn reduction_db(&self, settings: &CompressorSettings) -> f32 {
        self.envelope_db
            - gain_computer(
                self.envelope_db,
                settings.threshold_db,
                settings.ratio,
                settings.knee_db,
            )
    }

    #[inline]
    pub fn process(&mut self, sample: f32, settings: &CompressorSettings) -> f32 {
        let level_db = linear_to_db(sample.abs());
        let coef = if level_db > self.envelope_db {
            settings.attack_coef
        } else {
            settings.release_coef
        };
        self.envelope_db = coef * self.envelope_db + (1.0 - coef) * level_db;

        let reduction = self.reduction_db(settings);
        sample * db_to_linear(settings.makeup_db - reduction)
    }

    pub fn reset(&mut self) {
        self.envelope_db = SILENCE_DB;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(ratio: f32, knee_db: f32) -> CompressorSettings {
        CompressorSettings {
            threshold_db: -20.0,
            ratio,
            attack_coef: time_coef(1.0, 48_000.0),
            release_coef: time_coef(100.0, 48_000.0),
            makeup_db: 0.0,
            knee_db,
        }
    }

    #[test]
    fn below_threshold_is_untouched() {
        assert_eq!(gain_computer(-40.0, -20.0, 4.0, 6.0), -40.0);
    }

    #[test]
    fn above_knee_follows_ratio() {
        // 20 dB over at 4:1 comes out 5 dB over
        let y = gain_computer(0.0, -20.0, 4.0, 6.0);
        assert!((y + 15.0).abs() < 1e-4, "got {y}");
    }

    #[test]
    fn knee_is_continuous() {
        let edge = -20.0 + 3.0;
        let inside = gain_computer(edge - 1e-3, -20.0, 4.0, 6.0);
        let outside = gain_computer(edge + 1e-3, -20.0, 4.0, 6.0);
        assert!((inside - outside).abs() < 0.01);
    }

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::new();
        let s = settings(4.0, 0.0);
        let mut last = 0.0;
        for _ in 0..48_000 {
            last = comp.process(1.0, &s);
        }
        // 0 dBFS at -20 / 4:1 settles near -15 dB
        let expected = db_to_linear(-15.0);
        assert!((last - expected).abs() < 0.01, "got {last}, expected {expected}");
    }

    #[test]
    fn silence_stays_silent() {
        let mut comp = Compressor::new();
        let s = settings(8.0, 6.0);
        assert_eq!(comp.process(0.0, &s), 0.0);
    }

    #[test]
    fn db_round_trip() {
        assert!((linear_to_db(db_to_linear(-6.0)) + 6.0).abs() < 1e-4);
        assert_eq!(linear_to_db(0.0), SILENCE_DB);
    }
}
