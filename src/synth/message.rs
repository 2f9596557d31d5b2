use std::{fmt, sync::Arc, time::Duration};

use rtrb::Consumer;

use crate::{
    effects::EffectsChain,
    patch::{ModuleLocation, VoiceGraph},
};

/// Note velocity as either a MIDI byte or a normalised value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Velocity {
    Midi(u8),
    Normalized(f32),
}

impl Velocity {
    /// Velocity in 0.0..=1.0.
    pub fn to_unit(self) -> f32 {
        match self {
            Velocity::Midi(v) => f32::from(v.min(127)) / 127.0,
            Velocity::Normalized(v) if v.is_nan() => 0.0,
            Velocity::Normalized(v) => v.clamp(0.0, 1.0),
        }
    }
}

impl From<u8> for Velocity {
    fn from(value: u8) -> Self {
        Velocity::Midi(value)
    }
}

impl From<f32> for Velocity {
    fn from(value: f32) -> Self {
        Velocity::Normalized(value)
    }
}

/// Control → render.
#[derive(Debug)]
pub enum EngineCommand {
    NoteOn {
        note: u8,
        velocity: f32,
        timestamp: u64,
    },
    NoteOff {
        note: u8,
        timestamp: u64,
    },
    /// Deflection in -1.0..=1.0.
    PitchBend { value: f32 },
    /// Built-in controllers only: 7, 64, 120, 123.
    ControlChange { controller: u8, value: u8 },
    SetParameter {
        location: ModuleLocation,
        param: usize,
        value: f32,
    },
    SetMasterVolume(f32),
    SwapGraph(Arc<VoiceGraph>),
    SwapEffects(Box<EffectsChain>),
    AllNotesOff,
    Stop { immediate: bool },
}

/// Render → control.
#[derive(Debug)]
pub enum EngineEvent {
    DeadlineMiss {
        block: u64,
        elapsed: Duration,
        budget: Duration,
    },
    /// A value the render thread no longer uses, handed back to be dropped.
    Retired(Retired),
    VoiceStolen { slot: usize, note: u8 },
}

pub enum Retired {
    Graph(Arc<VoiceGraph>),
    Effects(Box<EffectsChain>),
}

impl fmt::Debug for Retired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retired::Graph(graph) => write!(f, "Graph(v{})", graph.version),
            Retired::Effects(chain) => write!(f, "Effects({} slots)", chain.len()),
        }
    }
}

pub trait CommandReceiver {
    fn next_command(&mut self) -> Option<EngineCommand>;
}

impl CommandReceiver for Consumer<EngineCommand> {
    fn next_command(&mut self) -> Option<EngineCommand> {
        Consumer::pop(self).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_normalises() {
        assert_eq!(Velocity::from(127u8).to_unit(), 1.0);
        assert_eq!(Velocity::from(0u8).to_unit(), 0.0);
        assert!((Velocity::Midi(100).to_unit() - 100.0 / 127.0).abs() < 1e-6);
        assert_eq!(Velocity::from(1.5f32).to_unit(), 1.0);
        assert_eq!(Velocity::Normalized(f32::NAN).to_unit(), 0.0);
    }
}
