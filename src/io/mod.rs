//! Bridges from external event formats into engine commands.

pub mod converter;
pub mod midi;

pub use converter::midi_to_command;
pub use midi::MidiEvent;
