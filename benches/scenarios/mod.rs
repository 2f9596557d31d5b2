//! Scenario benchmarks.
//!
//! Preset patches rendered through the whole engine at several polyphony
//! levels, plus the global effects chain on its own.

mod effects;
mod engine;

pub use effects::bench_effects;
pub use engine::bench_engine;
