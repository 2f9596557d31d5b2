use std::sync::Arc;

use crate::{
    dsp::guard::{peak, sanitize},
    module::{params::ParamSet, Module, RenderCtx},
    patch::{VoiceGraph, MAX_MODULES},
    MAX_BLOCK_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,      // Available for allocation
    Active,    // Key held
    Releasing, // Key released, envelopes in release
    Stealing,  // Forced fade, then the pending note starts here
}

/// A note waiting for a stolen slot to finish fading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingNote {
    pub note: u8,
    pub velocity: f32,
    pub timestamp: u64,
    pub sequence: u64,
    /// Key already released while the sustain pedal was down.
    pub sustained: bool,
}

/// Linear forced fade to silence.
#[derive(Debug, Clone, Copy)]
struct Fade {
    remaining: u32,
    total: u32,
}

impl Fade {
    fn new(frames: u32) -> Self {
        let frames = frames.max(1);
        Self {
            remaining: frames,
            total: frames,
        }
    }

    #[inline]
    fn next_gain(&mut self) -> f32 {
        let gain = self.remaining as f32 / self.total as f32;
        self.remaining = self.remaining.saturating_sub(1);
        gain
    }

    fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

/// One polyphonic voice: a topology snapshot plus its own module state.
pub struct Voice {
    state: VoiceState,
    note: u8,
    velocity: f32,
    timestamp: u64,
    sequence: u64,
    sample_rate: f32,
    graph: Arc<VoiceGraph>,
    modules: Vec<Module>,
    buffer: Vec<f32>,
    has_envelope: bool,
    fade: Option<Fade>,
    pending: Option<PendingNote>,
    sustained: bool,
    peak: f32,
    retired: Option<Arc<VoiceGraph>>,
}

impl Voice {
    pub fn new(graph: Arc<VoiceGraph>, sample_rate: f32) -> Self {
        let mut modules = Vec::with_capacity(MAX_MODULES);
        modules.extend(
            graph
                .modules
                .iter()
                .map(|spec| Module::instantiate(spec, sample_rate)),
        );
        Self {
            state: VoiceState::Idle,
            note: 0,
            velocity: 0.0,
            timestamp: 0,
            sequence: 0,
            sample_rate,
            has_envelope: graph.has_envelope(),
            graph,
            modules,
            buffer: vec![0.0; MAX_BLOCK_SIZE],
            fade: None,
            pending: None,
            sustained: false,
            peak: 0.0,
            retired: None,
        }
    }

    /// Begin a note on `graph`, with parameter bases taken from `bases`.
    ///
    /// Modules are reused in place when the snapshot's shape at that position
    /// matches; a differing shape is instantiated fresh.
    pub fn start(&mut self, pending: PendingNote, graph: &Arc<VoiceGraph>, bases: &[ParamSet]) {
        if !Arc::ptr_eq(&self.graph, graph) {
            self.bind(graph);
        } else {
            for module in &mut self.modules {
                module.reset();
            }
        }
        for (module, base) in self.modules.iter_mut().zip(bases) {
            *module.params_mut() = *base;
        }

        self.note = pending.note;
        self.velocity = pending.velocity;
        self.timestamp = pending.timestamp;
        self.sequence = pending.sequence;
        self.state = VoiceState::Active;
        self.fade = None;
        self.pending = None;
        self.sustained = pending.sustained;
        self.peak = 0.0;

        let ctx = self.ctx(1.0);
        for module in &mut self.modules {
            module.note_on(&ctx);
        }
    }

    fn bind(&mut self, graph: &Arc<VoiceGraph>) {
        self.modules.truncate(graph.modules.len());
        for (index, spec) in graph.modules.iter().enumerate() {
            match self.modules.get_mut(index) {
                Some(module) => {
                    if !module.reset_from(spec) {
                        *module = Module::instantiate(spec, self.sample_rate);
                    }
                }
                None => self
                    .modules
                    .push(Module::instantiate(spec, self.sample_rate)),
            }
        }
        self.has_envelope = graph.has_envelope();
        let previous = std::mem::replace(&mut self.graph, Arc::clone(graph));
        // Keep at most one retired snapshot; the engine drains it each block
        if self.retired.is_none() {
            self.retired = Some(previous);
        }
    }

    /// Key released. Voices without envelopes fade out over `fade_frames`.
    pub fn release(&mut self, fade_frames: u32) {
        self.sustained = false;
        if self.state != VoiceState::Active {
            return;
        }
        self.state = VoiceState::Releasing;
        let ctx = self.ctx(1.0);
        for module in &mut self.modules {
            module.note_off(&ctx);
        }
        if !self.has_envelope {
            self.fade = Some(Fade::new(fade_frames));
        }
    }

    /// Fade out over `fade_frames`, then start `pending` in this slot.
    pub fn steal(&mut self, pending: PendingNote, fade_frames: u32) {
        self.begin_fade(fade_frames);
        self.state = VoiceState::Stealing;
        self.sustained = false;
        self.pending = Some(pending);
    }

    /// Fade to silence without a follow-up note.
    pub fn force_stop(&mut self, fade_frames: u32) {
        if self.state == VoiceState::Idle {
            return;
        }
        self.begin_fade(fade_frames);
        self.state = VoiceState::Stealing;
        self.sustained = false;
        self.pending = None;
    }

    /// Key released under the sustain pedal: keep sounding until it lifts.
    pub fn hold(&mut self) {
        if self.state == VoiceState::Active {
            self.sustained = true;
        }
    }

    pub fn hold_pending(&mut self) {
        if let Some(pending) = &mut self.pending {
            pending.sustained = true;
        }
    }

    pub fn is_sustained(&self) -> bool {
        self.sustained
    }

    fn begin_fade(&mut self, fade_frames: u32) {
        // An in-flight fade keeps its current gain and may only get shorter
        match &mut self.fade {
            Some(fade) if fade.remaining <= fade_frames => {}
            _ => self.fade = Some(Fade::new(fade_frames)),
        }
    }

    pub fn replace_pending(&mut self, pending: PendingNote) {
        if self.state == VoiceState::Stealing {
            self.pending = Some(pending);
        }
    }

    pub fn cancel_pending(&mut self) -> Option<PendingNote> {
        self.pending.take()
    }

    pub fn take_pending(&mut self) -> Option<PendingNote> {
        if self.state == VoiceState::Idle {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn take_retired(&mut self) -> Option<Arc<VoiceGraph>> {
        self.retired.take()
    }

    fn ctx(&self, bend_ratio: f32) -> RenderCtx {
        RenderCtx::from_note(self.sample_rate, self.note, self.velocity, bend_ratio)
    }

    /// Render one block and add it into `out`.
    pub fn render(&mut self, out: &mut [f32], bend_ratio: f32) {
        if self.state == VoiceState::Idle {
            return;
        }
        let frames = out.len().min(MAX_BLOCK_SIZE);
        let ctx = self.ctx(bend_ratio);
        let buffer = &mut self.buffer[..frames];
        buffer.fill(0.0);

        let routing = &self.graph.routing;

        // 1. Control pass
        for &index in routing.control_order() {
            routing.modulate(index, &mut self.modules);
            self.modules[index].advance_control(frames, &ctx);
        }

        // 2. Freeze audio-rate parameters
        for index in 0..self.modules.len() {
            if !self.modules[index].is_control_rate() {
                routing.modulate(index, &mut self.modules);
            }
        }

        // 3. Audio pass in pipeline order
        for module in &mut self.modules {
            module.process_audio(buffer, &ctx);
        }

        if let Some(fade) = &mut self.fade {
            for sample in buffer.iter_mut() {
                *sample *= fade.next_gain();
            }
        }
        sanitize(buffer);
        self.peak = peak(buffer);

        for (o, s) in out.iter_mut().zip(buffer.iter()) {
            *o += s;
        }

        self.update_state();
    }

    fn update_state(&mut self) {
        let faded = self.fade.is_some_and(|f| f.is_done());
        let envelopes_done = self.has_envelope
            && self
                .modules
                .iter()
                .filter_map(Module::envelope_finished)
                .all(|finished| finished);

        let done = match self.state {
            VoiceState::Stealing => faded,
            VoiceState::Releasing => faded || envelopes_done,
            _ => false,
        };
        if done {
            self.state = VoiceState::Idle;
            self.fade = None;
            self.peak = 0.0;
        }
    }

    /// Set a base parameter on the module at pipeline `index`.
    pub fn set_parameter(&mut self, index: usize, param: usize, value: f32) {
        if let Some(module) = self.modules.get_mut(index) {
            module.params_mut().set_base(param, value);
        }
    }

    pub fn graph(&self) -> &Arc<VoiceGraph> {
        &self.graph
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Peak of the last rendered block.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn pending(&self) -> Option<&PendingNote> {
        self.pending.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dsp::{envelope::EnvelopeCurve, filter::FilterType, oscillator::Waveform},
        module::ModuleShape,
        patch::Patch,
    };

    const SAMPLE_RATE: f32 = 48_000.0;

    fn graph(with_envelope: bool) -> Arc<VoiceGraph> {
        let mut patch = Patch::new();
        patch
            .add_module(ModuleShape::Oscillator(Waveform::Sine))
            .unwrap();
        if with_envelope {
            let env = patch
                .add_module(ModuleShape::Envelope(EnvelopeCurve::Linear))
                .unwrap();
            patch.set_parameter(env, "release", 0.01).unwrap();
        }
        Arc::new(patch.voice_graph(1))
    }

    fn bases(graph: &VoiceGraph) -> Vec<ParamSet> {
        graph.modules.iter().map(|m| m.params).collect()
    }

    fn note(note: u8) -> PendingNote {
        PendingNote {
            note,
            velocity: 1.0,
            timestamp: 0,
            sequence: 0,
            sustained: false,
        }
    }

    #[test]
    fn released_voice_goes_idle_after_envelope() {
        let graph = graph(true);
        let mut voice = Voice::new(Arc::clone(&graph), SAMPLE_RATE);
        voice.start(note(69), &graph, &bases(&graph));
        let mut out = vec![0.0; 256];
        voice.render(&mut out, 1.0);
        assert!(voice.peak() > 0.0);

        voice.release(240);
        assert_eq!(voice.state(), VoiceState::Releasing);
        for _ in 0..20 {
            out.fill(0.0);
            voice.render(&mut out, 1.0);
        }
        assert!(voice.is_idle(), "release should finish within 100ms");
    }

    #[test]
    fn voice_without_envelope_fades_after_release() {
        let graph = graph(false);
        let mut voice = Voice::new(Arc::clone(&graph), SAMPLE_RATE);
        voice.start(note(60), &graph, &bases(&graph));
        let mut out = vec![0.0; 128];
        voice.render(&mut out, 1.0);

        voice.release(240);
        out.fill(0.0);
        voice.render(&mut out, 1.0);
        assert_eq!(voice.state(), VoiceState::Releasing);
        out.fill(0.0);
        voice.render(&mut out, 1.0);
        assert!(voice.is_idle());
    }

    #[test]
    fn steal_hands_over_to_pending_note() {
        let graph = graph(true);
        let mut voice = Voice::new(Arc::clone(&graph), SAMPLE_RATE);
        voice.start(note(60), &graph, &bases(&graph));
        let mut out = vec![0.0; 256];
        voice.render(&mut out, 1.0);

        voice.steal(note(72), 240);
        voice.render(&mut out, 1.0);
        assert!(voice.is_idle());
        let pending = voice.take_pending().unwrap();
        assert_eq!(pending.note, 72);
        voice.start(pending, &graph, &bases(&graph));
        assert_eq!(voice.note(), 72);
        assert_eq!(voice.state(), VoiceState::Active);
    }

    #[test]
    fn new_graph_reuses_matching_modules_and_retires_old_one() {
        let first = graph(true);
        let second = graph(true);
        let mut voice = Voice::new(Arc::clone(&first), SAMPLE_RATE);
        voice.start(note(60), &second, &bases(&second));
        assert!(Arc::ptr_eq(voice.graph(), &second));
        let retired = voice.take_retired().unwrap();
        assert!(Arc::ptr_eq(&retired, &first));
    }

    #[test]
    fn new_graph_with_different_shapes_instantiates_modules() {
        let mut patch = Patch::new();
        patch
            .add_module(ModuleShape::Oscillator(Waveform::Sine))
            .unwrap();
        patch
            .add_module(ModuleShape::Filter(FilterType::LowPass))
            .unwrap();
        let filtered = Arc::new(patch.voice_graph(1));
        let enveloped = graph(true);
        let mut voice = Voice::new(Arc::clone(&filtered), SAMPLE_RATE);
        assert!(!voice.has_envelope);
        voice.start(note(69), &enveloped, &bases(&enveloped));
        assert!(voice.has_envelope);
        assert_eq!(voice.modules.len(), 2);

        let mut out = vec![0.0; 256];
        voice.render(&mut out, 1.0);
        assert!(voice.peak() > 0.0);

        voice.release(240);
        for _ in 0..20 {
            out.fill(0.0);
            voice.render(&mut out, 1.0);
        }
        assert!(voice.is_idle(), "envelope from the new graph should end the note");
    }

    #[test]
    fn sustained_voice_releases_only_once_pedal_lifts() {
        let graph = graph(true);
        let mut voice = Voice::new(Arc::clone(&graph), SAMPLE_RATE);
        voice.start(note(60), &graph, &bases(&graph));
        voice.hold();
        assert!(voice.is_sustained());
        assert_eq!(voice.state(), VoiceState::Active);

        voice.release(240);
        assert!(!voice.is_sustained());
        assert_eq!(voice.state(), VoiceState::Releasing);
    }
}
