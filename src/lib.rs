pub mod config;
pub mod dsp; // DSP primitives
pub mod effects;
pub mod engine; // Render engine and control handle
pub mod error;
pub mod io; // MIDI bridge
pub mod module; // Patchable modules and their parameters
pub mod patch; // Pipeline, routing, topology export
pub mod presets;
pub mod synth; // Voices and polyphony

pub use config::{BitDepth, EngineConfig};
pub use engine::{create, Controller, Engine};
pub use error::{ConfigError, ControlError, PatchError};
pub use module::{ModuleId, ModuleShape};
pub use patch::Patch;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
