//! Render engine.
//!
//! [`create`] builds the two halves of a running synthesizer: the [`Engine`],
//! which lives on the audio callback thread, and the [`Controller`], which
//! any other thread uses to play notes and edit the patch. They talk only
//! through two bounded lock-free rings.
//!
//! ```text
//!   Controller ──EngineCommand──▶ Engine
//!        ▲                          │
//!        └──────EngineEvent─────────┘   (deadline misses, retired values)
//! ```
//!
//! The engine renders in fixed blocks of `block_size` frames no matter how
//! large the host's buffer is; commands take effect at block boundaries.

pub mod controller;
pub mod deadline;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    config::EngineConfig,
    dsp::guard::sanitize,
    effects::EffectsChain,
    error::ConfigError,
    io::converter::{CC_ALL_NOTES_OFF, CC_ALL_SOUND_OFF, CC_SUSTAIN, CC_VOLUME},
    module::params::ParamSet,
    patch::{ModuleLocation, Patch, VoiceGraph, MAX_MODULES},
    synth::{
        allocator::{Allocation, VoicePool},
        message::{CommandReceiver, EngineCommand, EngineEvent, Retired},
    },
    MAX_BLOCK_SIZE,
};

pub use controller::Controller;
use deadline::DeadlineMonitor;

/// Running counts shared between the engine and its controller. They keep
/// counting when the event ring is full.
#[derive(Debug, Default)]
pub struct EngineStats {
    deadline_misses: AtomicU64,
    voices_stolen: AtomicU64,
}

impl EngineStats {
    pub fn deadline_misses(&self) -> u64 {
        self.deadline_misses.load(Ordering::Relaxed)
    }

    pub fn voices_stolen(&self) -> u64 {
        self.voices_stolen.load(Ordering::Relaxed)
    }
}

/// Build an engine/controller pair for `patch`.
pub fn create(config: EngineConfig, patch: Patch) -> Result<(Engine, Controller), ConfigError> {
    config.validate()?;

    let (command_tx, command_rx) = RingBuffer::new(config.command_capacity);
    let (event_tx, event_rx) = RingBuffer::new(config.event_capacity);

    let graph = Arc::new(patch.voice_graph(1));
    let effects = Box::new(patch.effects_chain(config.sample_rate));

    log::info!(
        "engine created: {} Hz, {} frames/block, {} voices, {} modules, {} effects",
        config.sample_rate,
        config.block_size,
        config.polyphony,
        patch.modules().len(),
        patch.effects().len()
    );

    let stats = Arc::new(EngineStats::default());
    let engine = Engine::new(
        config.clone(),
        graph,
        effects,
        command_rx,
        event_tx,
        Arc::clone(&stats),
    );
    let controller = Controller::new(config, patch, 1, command_tx, event_rx, stats);
    Ok((engine, controller))
}

pub struct Engine {
    config: EngineConfig,
    commands: Consumer<EngineCommand>,
    events: Producer<EngineEvent>,
    stats: Arc<EngineStats>,
    graph: Arc<VoiceGraph>,
    bases: [ParamSet; MAX_MODULES],
    effects: Box<EffectsChain>,
    pool: VoicePool,
    deadline: DeadlineMonitor,
    block: Vec<f32>,
    cursor: usize,
    bend_ratio: f32,
    master_volume: f32,
    steal_frames: u32,
    stop_frames: u32,
    blocks_rendered: u64,
}

impl Engine {
    fn new(
        config: EngineConfig,
        graph: Arc<VoiceGraph>,
        effects: Box<EffectsChain>,
        commands: Consumer<EngineCommand>,
        events: Producer<EngineEvent>,
        stats: Arc<EngineStats>,
    ) -> Self {
        let mut bases = [ParamSet::new(&[]); MAX_MODULES];
        for (base, spec) in bases.iter_mut().zip(&graph.modules) {
            *base = spec.params;
        }
        Self {
            pool: VoicePool::new(config.polyphony, &graph, config.sample_rate),
            deadline: DeadlineMonitor::new(&config),
            block: vec![0.0; MAX_BLOCK_SIZE],
            // Forces a render on the first request
            cursor: config.block_size,
            steal_frames: config.ms_to_frames(config.steal_fade_ms),
            stop_frames: config.ms_to_frames(config.stop_fade_ms),
            bend_ratio: 1.0,
            master_volume: 1.0,
            blocks_rendered: 0,
            config,
            commands,
            events,
            stats,
            graph,
            bases,
            effects,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Voices that are not idle.
    pub fn active_voices(&self) -> usize {
        self.pool.active_count()
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered
    }

    /// Fill an interleaved buffer of `channels` channels.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let channels = self.config.channels;
        for frame in out.chunks_mut(channels) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }

    /// Render `frames` interleaved frames into a new buffer. Allocates; meant
    /// for offline use.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.config.channels];
        self.render_block(&mut out);
        out
    }

    /// Fill an interleaved 16-bit buffer.
    pub fn render_i16(&mut self, out: &mut [i16]) {
        let channels = self.config.channels;
        for frame in out.chunks_mut(channels) {
            let sample = self.next_sample().clamp(-1.0, 1.0);
            frame.fill((sample * f32::from(i16::MAX)).round() as i16);
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.cursor >= self.config.block_size {
            self.process_block();
            self.cursor = 0;
        }
        let sample = self.block[self.cursor];
        self.cursor += 1;
        self.config.bit_depth.quantize(sample)
    }

    fn process_block(&mut self) {
        let started = self.deadline.begin();
        self.drain_commands();

        let frames = self.config.block_size;
        let block = &mut self.block[..frames];
        block.fill(0.0);

        let voice_modules = self.graph.modules.len();
        self.pool.render(
            block,
            self.bend_ratio,
            &self.graph,
            &self.bases[..voice_modules],
        );

        let gain = self.config.headroom * self.master_volume;
        for sample in block.iter_mut() {
            *sample *= gain;
        }

        if !self.deadline.is_degraded() {
            self.effects.process(block);
        }
        sanitize(block);

        let events = &mut self.events;
        self.pool.drain_retired(|graph| {
            // Full ring: the snapshot is dropped here instead
            let _ = events.push(EngineEvent::Retired(Retired::Graph(graph)));
        });

        if let Some(miss) = self.deadline.end(started) {
            self.stats.deadline_misses.fetch_add(1, Ordering::Relaxed);
            let _ = self.events.push(EngineEvent::DeadlineMiss {
                block: self.blocks_rendered,
                elapsed: miss.elapsed,
                budget: miss.budget,
            });
        }
        self.blocks_rendered += 1;
    }

    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.next_command() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::NoteOn {
                note,
                velocity,
                timestamp,
            } => {
                let voice_modules = self.graph.modules.len();
                let allocation = self.pool.note_on(
                    note,
                    velocity,
                    timestamp,
                    &self.graph,
                    &self.bases[..voice_modules],
                    self.steal_frames,
                );
                if let Allocation::Stolen { slot, note } = allocation {
                    self.stats.voices_stolen.fetch_add(1, Ordering::Relaxed);
                    let _ = self.events.push(EngineEvent::VoiceStolen { slot, note });
                }
            }
            EngineCommand::NoteOff { note, .. } => self.pool.note_off(note, self.stop_frames),
            EngineCommand::PitchBend { value } => {
                let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
                self.bend_ratio = 2.0_f32.powf(value * self.config.pitch_bend_range / 12.0);
            }
            EngineCommand::ControlChange { controller, value } => {
                self.control_change(controller, value)
            }
            EngineCommand::SetParameter {
                location,
                param,
                value,
            } => self.set_parameter(location, param, value),
            EngineCommand::SetMasterVolume(volume) => {
                self.master_volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
            }
            EngineCommand::SwapGraph(graph) => {
                for (base, spec) in self.bases.iter_mut().zip(&graph.modules) {
                    *base = spec.params;
                }
                let previous = std::mem::replace(&mut self.graph, graph);
                self.retire(Retired::Graph(previous));
            }
            EngineCommand::SwapEffects(chain) => {
                let previous = std::mem::replace(&mut self.effects, chain);
                self.retire(Retired::Effects(previous));
            }
            EngineCommand::AllNotesOff => self.pool.release_all(self.stop_frames),
            EngineCommand::Stop { immediate: true } => self.pool.stop_all(self.stop_frames),
            EngineCommand::Stop { immediate: false } => self.pool.release_all(self.stop_frames),
        }
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        match controller {
            CC_VOLUME => self.master_volume = f32::from(value.min(127)) / 127.0,
            CC_SUSTAIN => self.pool.set_sustain(value >= 64, self.stop_frames),
            CC_ALL_SOUND_OFF => self.pool.stop_all(self.stop_frames),
            CC_ALL_NOTES_OFF => self.pool.release_all(self.stop_frames),
            _ => {}
        }
    }

    fn set_parameter(&mut self, location: ModuleLocation, param: usize, value: f32) {
        match location {
            ModuleLocation::Voice(index) => {
                if index < self.graph.modules.len() {
                    self.bases[index].set_base(param, value);
                    self.pool.set_parameter(&self.graph, index, param, value);
                }
            }
            ModuleLocation::Global(index) => {
                if let Some(module) = self.effects.module_mut(index) {
                    module.params_mut().set_base(param, value);
                }
            }
        }
    }

    fn retire(&mut self, retired: Retired) {
        // Full ring: dropped here instead
        let _ = self.events.push(EngineEvent::Retired(retired));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BitDepth, dsp::oscillator::Waveform, module::ModuleShape, presets};

    fn engine(config: EngineConfig) -> (Engine, Controller) {
        create(config, presets::lead()).unwrap()
    }

    fn sine() -> Patch {
        let mut patch = Patch::new();
        patch
            .add_module(ModuleShape::Oscillator(Waveform::Sine))
            .unwrap();
        patch
    }

    #[test]
    fn silent_without_notes() {
        let (mut engine, _controller) = engine(EngineConfig::default());
        let out = engine.render(1024);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(engine.blocks_rendered(), 4);
    }

    #[test]
    fn channels_carry_the_same_signal() {
        let (mut engine, mut controller) = engine(EngineConfig::default().with_channels(2));
        controller.note_on(69, 100u8, 0).unwrap();
        let out = engine.render(512);
        assert!(out.iter().any(|&s| s != 0.0));
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn host_buffer_size_does_not_change_output() {
        let play = |chunk: usize| {
            let (mut engine, mut controller) = engine(EngineConfig::default().with_channels(1));
            controller.note_on(60, 90u8, 0).unwrap();
            let mut out = vec![0.0; 4096];
            for piece in out.chunks_mut(chunk) {
                engine.render_block(piece);
            }
            out
        };
        assert_eq!(play(4096), play(100));
    }

    #[test]
    fn i16_output_matches_float_output() {
        let config = EngineConfig::default().with_channels(1);
        let (mut a, mut ca) = engine(config.clone());
        let (mut b, mut cb) = engine(config);
        ca.note_on(64, 127u8, 0).unwrap();
        cb.note_on(64, 127u8, 0).unwrap();
        let floats = a.render(512);
        let mut ints = vec![0i16; 512];
        b.render_i16(&mut ints);
        for (f, i) in floats.iter().zip(&ints) {
            assert!((f * 32_767.0 - f32::from(*i)).abs() <= 1.0);
        }
    }

    #[test]
    fn sustain_pedal_holds_notes() {
        let (mut engine, mut controller) = engine(EngineConfig::default());
        controller.note_on(60, 100u8, 0).unwrap();
        controller.control_change(CC_SUSTAIN, 127).unwrap();
        controller.note_off(60, 1).unwrap();
        engine.render(48_000);
        assert_eq!(engine.active_voices(), 1);

        controller.control_change(CC_SUSTAIN, 0).unwrap();
        engine.render(48_000);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn immediate_stop_silences_within_fade() {
        let (mut engine, mut controller) = engine(EngineConfig::default());
        for note in [60, 64, 67] {
            controller.note_on(note, 100u8, 0).unwrap();
        }
        engine.render(2048);
        controller.stop(true).unwrap();
        engine.render(512);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn master_volume_scales_output() {
        let play = |volume: f32| {
            let config = EngineConfig::default().with_channels(1);
            let (mut engine, mut controller) = create(config, sine()).unwrap();
            controller.set_master_volume(volume).unwrap();
            controller.note_on(69, 127u8, 0).unwrap();
            engine.render(256)
        };
        let full = play(1.0);
        let half = play(0.5);
        for (f, h) in full.iter().zip(&half) {
            assert!((f * 0.5 - h).abs() < 1e-6);
        }
    }

    #[test]
    fn int16_depth_quantizes_float_output() {
        let config = EngineConfig::default()
            .with_channels(1)
            .with_bit_depth(BitDepth::Int16);
        let (mut engine, mut controller) = create(config, sine()).unwrap();
        controller.note_on(69, 127u8, 0).unwrap();
        for sample in engine.render(512) {
            let scaled = sample * 32_767.0;
            assert!((scaled - scaled.round()).abs() < 1e-2, "{sample} is off the grid");
        }
    }

    #[test]
    fn overrun_is_reported_to_controller() {
        let config = EngineConfig {
            deadline_budget: 1.0e-9,
            ..EngineConfig::default().with_deadline_guard(true)
        };
        let (mut engine, mut controller) = engine(config);
        controller.note_on(60, 100u8, 0).unwrap();
        engine.render(1024);
        let misses = controller
            .poll_events()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::DeadlineMiss { .. }))
            .count();
        assert!(misses > 0);
        assert_eq!(controller.deadline_misses(), misses as u64);
    }

    #[test]
    fn counters_survive_a_full_event_ring() {
        let config = EngineConfig {
            event_capacity: 1,
            deadline_budget: 1.0e-9,
            ..EngineConfig::default()
                .with_channels(1)
                .with_polyphony(1)
                .with_deadline_guard(true)
        };
        let (mut engine, mut controller) = create(config, sine()).unwrap();
        controller.note_on(60, 100u8, 0).unwrap();
        controller.note_on(62, 100u8, 1).unwrap();
        controller.note_on(64, 100u8, 2).unwrap();
        engine.render(256 * 8);

        let events = controller.poll_events();
        assert_eq!(events.len(), 1, "ring holds a single event");
        assert_eq!(controller.voices_stolen(), 1);
        assert_eq!(controller.deadline_misses(), 8);
    }
}
