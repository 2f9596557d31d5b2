/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Context passed to modules while a voice renders
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - frequency: Note pitch in Hz with pitch bend already applied
/// - velocity: Note intensity, normalised to 0.0-1.0
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frequency: f32,
    pub velocity: f32,
}

impl RenderCtx {
    /// Context for a MIDI note with a pitch-bend ratio applied.
    pub fn from_note(sample_rate: f32, note: u8, velocity: f32, bend_ratio: f32) -> Self {
        Self {
            sample_rate,
            frequency: midi_note_to_freq(note) * bend_ratio,
            velocity,
        }
    }

    /// Context for a direct frequency (tests and offline tools).
    pub fn from_freq(sample_rate: f32, frequency: f32, velocity: f32) -> Self {
        Self {
            sample_rate,
            frequency,
            velocity,
        }
    }
}
