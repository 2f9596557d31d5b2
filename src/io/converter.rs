use crate::{
    io::midi::MidiEvent,
    synth::message::{EngineCommand, Velocity},
};

/// Controllers the engine interprets itself.
pub const CC_VOLUME: u8 = 7;
pub const CC_SUSTAIN: u8 = 64;
pub const CC_ALL_SOUND_OFF: u8 = 120;
pub const CC_ALL_NOTES_OFF: u8 = 123;

pub fn is_builtin_control(controller: u8) -> bool {
    matches!(
        controller,
        CC_VOLUME | CC_SUSTAIN | CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF
    )
}

/// Map a 14-bit pitch-bend value onto -1.0..=1.0.
pub fn pitch_bend_to_unit(value: i16) -> f32 {
    if value >= 0 {
        (f32::from(value) / 8191.0).min(1.0)
    } else {
        (f32::from(value) / 8192.0).max(-1.0)
    }
}

/// Convert a MIDI message on `channel_filter` into an engine command.
///
/// Note-on with velocity 0 is a note-off. Controllers without a built-in
/// meaning and program changes yield `None`.
pub fn midi_to_command(midi: MidiEvent, channel_filter: u8, timestamp: u64) -> Option<EngineCommand> {
    if midi.channel() != channel_filter {
        return None;
    }
    match midi {
        MidiEvent::NoteOn { key, velocity: 0, .. } | MidiEvent::NoteOff { key, .. } => {
            Some(EngineCommand::NoteOff {
                note: key,
                timestamp,
            })
        }
        MidiEvent::NoteOn { key, velocity, .. } => Some(EngineCommand::NoteOn {
            note: key,
            velocity: Velocity::Midi(velocity).to_unit(),
            timestamp,
        }),
        MidiEvent::ControlChange {
            controller, value, ..
        } if is_builtin_control(controller) => Some(EngineCommand::ControlChange { controller, value }),
        MidiEvent::PitchBend { value, .. } => Some(EngineCommand::PitchBend {
            value: pitch_bend_to_unit(value),
        }),
        _ => None,
    }
}
