//! Engine configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, MAX_BLOCK_SIZE};

/// Output sample resolution handed to the device or export collaborator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Float32,
    Int16,
    Int24,
}

impl BitDepth {
    /// Quantize a sample to this depth's grid. `Float32` passes through.
    #[inline]
    pub fn quantize(self, sample: f32) -> f32 {
        let steps = match self {
            BitDepth::Float32 => return sample,
            BitDepth::Int16 => 32_767.0,
            BitDepth::Int24 => 8_388_607.0,
        };
        (sample.clamp(-1.0, 1.0) * steps).round() / steps
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Frames per render block. Commands are applied between blocks.
    pub block_size: usize,
    /// Interleaved output channels. The engine is mono internally.
    pub channels: usize,
    pub bit_depth: BitDepth,
    /// Voice pool size.
    pub polyphony: usize,
    /// Fixed gain applied to the voice sum before the effects chain.
    pub headroom: f32,
    /// Forced fade applied to a stolen voice.
    pub steal_fade_ms: f32,
    /// Forced fade used by an immediate stop.
    pub stop_fade_ms: f32,
    /// Semitones reached at full pitch-bend deflection.
    pub pitch_bend_range: f32,
    pub command_capacity: usize,
    pub event_capacity: usize,
    /// Time every block and bypass effects after an overrun.
    pub deadline_guard: bool,
    /// Fraction of the block period a render may take.
    pub deadline_budget: f32,
    /// Blocks rendered without effects after a deadline miss.
    pub degrade_blocks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            channels: 2,
            bit_depth: BitDepth::Float32,
            polyphony: 16,
            headroom: 0.25,
            steal_fade_ms: 5.0,
            stop_fade_ms: 5.0,
            pitch_bend_range: 2.0,
            command_capacity: 1024,
            event_capacity: 256,
            deadline_guard: false,
            deadline_budget: 0.9,
            degrade_blocks: 8,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn with_polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    pub fn with_deadline_guard(mut self, enabled: bool) -> Self {
        self.deadline_guard = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8_000.0..=384_000.0).contains(&self.sample_rate) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::BlockSize {
                got: self.block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        if !(1..=8).contains(&self.channels) {
            return Err(ConfigError::Channels(self.channels));
        }
        if !(1..=256).contains(&self.polyphony) {
            return Err(ConfigError::Polyphony(self.polyphony));
        }
        for (name, value) in [
            ("headroom", self.headroom),
            ("steal_fade_ms", self.steal_fade_ms),
            ("stop_fade_ms", self.stop_fade_ms),
            ("deadline_budget", self.deadline_budget),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if self.pitch_bend_range < 0.0 {
            return Err(ConfigError::NotPositive {
                name: "pitch_bend_range",
                value: self.pitch_bend_range,
            });
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::Capacity("command"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Capacity("event"));
        }
        Ok(())
    }

    /// Number of frames in `ms` milliseconds, at least one.
    pub fn ms_to_frames(&self, ms: f32) -> u32 {
        ((ms / 1000.0) * self.sample_rate).round().max(1.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_oversized_blocks() {
        let config = EngineConfig::default().with_block_size(MAX_BLOCK_SIZE + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BlockSize { .. })
        ));
    }

    #[test]
    fn rejects_nan_headroom() {
        let config = EngineConfig {
            headroom: f32::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { name: "headroom", .. })
        ));
    }

    #[test]
    fn int16_quantizes_to_grid() {
        let q = BitDepth::Int16.quantize(0.123_456_78);
        let scaled = q * 32_767.0;
        assert!((scaled - scaled.round()).abs() < 1e-3);
        assert_eq!(BitDepth::Int16.quantize(3.0), 1.0);
        assert_eq!(BitDepth::Float32.quantize(3.0), 3.0);
    }
}
