//! Voice pool: allocation, stealing, sustain pedal.
//!
//! Steal order when no slot is idle:
//!
//! 1. a releasing voice, quietest first, then oldest note-on
//! 2. an active voice, quietest first, then oldest timestamp, then lowest
//!    sequence number
//! 3. every slot is already fading: the slot holding the oldest pending note
//!    gets the new note as its pending note instead
//!
//! A stolen slot fades out linearly before its pending note starts, so a
//! steal never produces a step in the output.

use std::sync::Arc;

use crate::{module::params::ParamSet, patch::VoiceGraph};

use super::voice::{PendingNote, Voice, VoiceState};

/// Outcome of a note-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    Started { slot: usize },
    Stolen { slot: usize, note: u8 },
    Queued { slot: usize },
}

pub struct VoicePool {
    voices: Vec<Voice>,
    sequence: u64,
    sustain: bool,
}

impl VoicePool {
    pub fn new(polyphony: usize, graph: &Arc<VoiceGraph>, sample_rate: f32) -> Self {
        Self {
            voices: (0..polyphony)
                .map(|_| Voice::new(Arc::clone(graph), sample_rate))
                .collect(),
            sequence: 0,
            sustain: false,
        }
    }

    pub fn note_on(
        &mut self,
        note: u8,
        velocity: f32,
        timestamp: u64,
        graph: &Arc<VoiceGraph>,
        bases: &[ParamSet],
        steal_frames: u32,
    ) -> Allocation {
        self.sequence += 1;
        let pending = PendingNote {
            note,
            velocity,
            timestamp,
            sequence: self.sequence,
            sustained: false,
        };

        if let Some(slot) = self.voices.iter().position(Voice::is_idle) {
            self.voices[slot].start(pending, graph, bases);
            return Allocation::Started { slot };
        }

        if let Some(slot) = self
            .quietest(VoiceState::Releasing)
            .or_else(|| self.quietest(VoiceState::Active))
        {
            let stolen = self.voices[slot].note();
            self.voices[slot].steal(pending, steal_frames);
            return Allocation::Stolen {
                slot,
                note: stolen,
            };
        }

        // Every slot is fading out already
        let slot = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.pending().map(|p| (p.timestamp, p.sequence)))
            .map(|(slot, _)| slot)
            .unwrap_or(0);
        if let Some(voice) = self.voices.get_mut(slot) {
            voice.replace_pending(pending);
        }
        Allocation::Queued { slot }
    }

    fn quietest(&self, state: VoiceState) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == state)
            .min_by(|(_, a), (_, b)| {
                a.peak()
                    .total_cmp(&b.peak())
                    .then(a.timestamp().cmp(&b.timestamp()))
                    .then(a.sequence().cmp(&b.sequence()))
            })
            .map(|(slot, _)| slot)
    }

    /// Release the most recently triggered voice (or pending note) with this
    /// pitch. While the sustain pedal is down the target is only marked held,
    /// and keeps sounding until the pedal lifts.
    pub fn note_off(&mut self, note: u8, release_frames: u32) {
        let active = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == VoiceState::Active && v.note() == note && !v.is_sustained())
            .max_by_key(|(_, v)| v.sequence())
            .map(|(slot, v)| (slot, v.sequence()));
        let pending = self
            .voices
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| {
                v.pending()
                    .filter(|p| p.note == note && !p.sustained)
                    .map(|p| (slot, p.sequence))
            })
            .max_by_key(|&(_, sequence)| sequence);

        let hold = self.sustain;
        match (active, pending) {
            (Some((_, a)), Some((slot, p))) if p > a => self.release_pending(slot, hold),
            (None, Some((slot, _))) => self.release_pending(slot, hold),
            (Some((slot, _)), _) if hold => self.voices[slot].hold(),
            (Some((slot, _)), _) => self.voices[slot].release(release_frames),
            (None, None) => {}
        }
    }

    fn release_pending(&mut self, slot: usize, hold: bool) {
        let voice = &mut self.voices[slot];
        if hold {
            voice.hold_pending();
        } else {
            voice.cancel_pending();
        }
    }

    /// Sustain pedal. Lifting it releases exactly the notes whose keys went up
    /// while it was down.
    pub fn set_sustain(&mut self, down: bool, release_frames: u32) {
        self.sustain = down;
        if down {
            return;
        }
        for voice in &mut self.voices {
            if voice.pending().is_some_and(|p| p.sustained) {
                voice.cancel_pending();
            }
            if voice.is_sustained() {
                voice.release(release_frames);
            }
        }
    }

    pub fn sustain(&self) -> bool {
        self.sustain
    }

    pub fn release_all(&mut self, release_frames: u32) {
        for voice in &mut self.voices {
            voice.cancel_pending();
            voice.release(release_frames);
        }
    }

    pub fn stop_all(&mut self, fade_frames: u32) {
        for voice in &mut self.voices {
            voice.force_stop(fade_frames);
        }
    }

    /// Render every sounding voice into `out`, then start any pending notes
    /// whose slot finished fading.
    pub fn render(
        &mut self,
        out: &mut [f32],
        bend_ratio: f32,
        graph: &Arc<VoiceGraph>,
        bases: &[ParamSet],
    ) {
        for voice in &mut self.voices {
            voice.render(out, bend_ratio);
            if let Some(pending) = voice.take_pending() {
                voice.start(pending, graph, bases);
            }
        }
    }

    /// Apply a base-parameter change to voices playing `graph`.
    pub fn set_parameter(&mut self, graph: &Arc<VoiceGraph>, index: usize, param: usize, value: f32) {
        for voice in &mut self.voices {
            if !voice.is_idle() && Arc::ptr_eq(voice.graph(), graph) {
                voice.set_parameter(index, param, value);
            }
        }
    }

    /// Hand every snapshot voices stopped using to `retire`.
    pub fn drain_retired(&mut self, mut retire: impl FnMut(Arc<VoiceGraph>)) {
        for voice in &mut self.voices {
            if let Some(graph) = voice.take_retired() {
                retire(graph);
            }
        }
    }

    /// Voices that are not idle.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_idle()).count()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl Allocation {
    pub fn slot(&self) -> usize {
        match *self {
            Allocation::Started { slot }
            | Allocation::Stolen { slot, .. }
            | Allocation::Queued { slot } => slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dsp::{envelope::EnvelopeCurve, oscillator::Waveform},
        module::ModuleShape,
        patch::Patch,
    };

    const SAMPLE_RATE: f32 = 48_000.0;
    const FADE: u32 = 240;

    struct Fixture {
        pool: VoicePool,
        graph: Arc<VoiceGraph>,
        bases: Vec<ParamSet>,
    }

    impl Fixture {
        fn new(polyphony: usize) -> Self {
            let mut patch = Patch::new();
            patch
                .add_module(ModuleShape::Oscillator(Waveform::Saw))
                .unwrap();
            patch
                .add_module(ModuleShape::Envelope(EnvelopeCurve::Exponential))
                .unwrap();
            let graph = Arc::new(patch.voice_graph(1));
            let bases = graph.modules.iter().map(|m| m.params).collect();
            Self {
                pool: VoicePool::new(polyphony, &graph, SAMPLE_RATE),
                graph,
                bases,
            }
        }

        fn note_on(&mut self, note: u8, timestamp: u64) -> Allocation {
            self.pool
                .note_on(note, 1.0, timestamp, &self.graph, &self.bases, FADE)
        }

        fn render(&mut self, frames: usize) {
            let mut out = vec![0.0; frames];
            self.pool.render(&mut out, 1.0, &self.graph, &self.bases);
        }
    }

    #[test]
    fn idle_slots_fill_lowest_first() {
        let mut f = Fixture::new(3);
        assert_eq!(f.note_on(60, 0), Allocation::Started { slot: 0 });
        assert_eq!(f.note_on(62, 1), Allocation::Started { slot: 1 });
        assert_eq!(f.pool.active_count(), 2);
    }

    #[test]
    fn releasing_voice_is_stolen_before_active() {
        let mut f = Fixture::new(2);
        f.note_on(60, 0);
        f.note_on(62, 1);
        f.render(256);
        f.pool.note_off(62, FADE);
        assert_eq!(
            f.note_on(64, 2),
            Allocation::Stolen { slot: 1, note: 62 }
        );
    }

    #[test]
    fn oldest_active_voice_is_stolen_on_equal_amplitude() {
        let mut f = Fixture::new(2);
        f.note_on(60, 0);
        f.note_on(60, 5);
        // No block rendered yet: both peaks are zero
        assert_eq!(
            f.note_on(67, 9),
            Allocation::Stolen { slot: 0, note: 60 }
        );
    }

    #[test]
    fn overflow_keeps_pool_size_voices_after_fade() {
        let mut f = Fixture::new(4);
        for (i, note) in [60, 62, 64, 65, 67].into_iter().enumerate() {
            f.note_on(note, i as u64);
        }
        f.render(256);
        assert_eq!(f.pool.active_count(), 4);
        let notes: Vec<u8> = f.pool.voices().iter().map(Voice::note).collect();
        assert!(notes.contains(&67), "pending note should have started: {notes:?}");
    }

    #[test]
    fn all_stealing_replaces_oldest_pending() {
        let mut f = Fixture::new(1);
        f.note_on(60, 0);
        assert!(matches!(f.note_on(62, 1), Allocation::Stolen { .. }));
        assert_eq!(f.note_on(64, 2), Allocation::Queued { slot: 0 });
        assert_eq!(f.pool.voices()[0].pending().map(|p| p.note), Some(64));
    }

    #[test]
    fn note_off_cancels_newer_pending_note() {
        let mut f = Fixture::new(1);
        f.note_on(60, 0);
        f.note_on(60, 1);
        f.pool.note_off(60, FADE);
        assert!(f.pool.voices()[0].pending().is_none());
        f.render(256);
        assert_eq!(f.pool.active_count(), 0);
    }

    #[test]
    fn sustain_defers_note_off_until_pedal_up() {
        let mut f = Fixture::new(2);
        f.note_on(60, 0);
        f.pool.set_sustain(true, FADE);
        assert!(f.pool.sustain());
        f.pool.note_off(60, FADE);
        assert_eq!(f.pool.voices()[0].state(), VoiceState::Active);

        f.pool.set_sustain(false, FADE);
        assert_eq!(f.pool.voices()[0].state(), VoiceState::Releasing);
    }

    #[test]
    fn pedal_up_releases_the_key_that_went_up_not_the_restruck_one() {
        let mut f = Fixture::new(2);
        f.pool.set_sustain(true, FADE);
        f.note_on(60, 0);
        f.pool.note_off(60, FADE);
        f.note_on(60, 10);
        f.render(256);

        f.pool.set_sustain(false, FADE);
        let states: Vec<(u64, VoiceState)> = f
            .pool
            .voices()
            .iter()
            .map(|v| (v.timestamp(), v.state()))
            .collect();
        assert_eq!(
            states,
            vec![(0, VoiceState::Releasing), (10, VoiceState::Active)]
        );

        // The held key's own note-off now releases it
        f.pool.note_off(60, FADE);
        assert_eq!(f.pool.voices()[1].state(), VoiceState::Releasing);
    }

    #[test]
    fn pending_note_released_under_pedal_is_dropped_on_lift() {
        let mut f = Fixture::new(1);
        f.note_on(60, 0);
        f.pool.set_sustain(true, FADE);
        f.note_on(62, 1);
        f.pool.note_off(62, FADE);
        assert!(f.pool.voices()[0].pending().is_some_and(|p| p.sustained));

        f.pool.set_sustain(false, FADE);
        assert!(f.pool.voices()[0].pending().is_none());
    }
}
