//! Low-level DSP primitives used by the patchable modules.
//!
//! These components allocate only at construction and are realtime-safe
//! afterwards, so they can live directly inside per-voice module state. They
//! stay focused on the signal-processing math; parameter handling and routing
//! live in `module` and `patch`.

/// Circular delay line with fractional reads.
pub mod delay;
/// Waveshapers, fold, and bit reduction.
pub mod distortion;
/// Level detection and compressor gain computer.
pub mod dynamics;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// RBJ biquad sections.
pub mod filter;
/// NaN and denormal hygiene.
pub mod guard;
pub mod modulate;
/// Phase-accumulator waveforms.
pub mod oscillator;
/// Schroeder reverb.
pub mod reverb;

pub use envelope::{EnvelopeCurve, EnvelopeStage};
pub use filter::FilterType;
pub use oscillator::Waveform;
