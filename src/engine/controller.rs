//! Control-side handle.
//!
//! The controller owns the authoritative [`Patch`]. Every edit is validated
//! against a copy first; only after the engine has accepted the resulting
//! command does the copy replace the patch, so a rejected edit or a full
//! queue leaves everything as it was.

use std::sync::Arc;

use log::{debug, warn};
use rtrb::{Consumer, Producer};

use crate::{
    config::EngineConfig,
    effects::EffectType,
    error::{ControlError, PatchError},
    io::{
        converter::{is_builtin_control, midi_to_command},
        midi::MidiEvent,
    },
    module::{ModuleId, ModuleShape, ModuleSpec},
    engine::EngineStats,
    patch::{ModuleLocation, Patch},
    synth::message::{EngineCommand, EngineEvent, Velocity},
};

/// What an edit rebuilds on the render side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebuild {
    VoiceGraph,
    Effects,
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    module: ModuleId,
    param: &'static str,
}

pub struct Controller {
    config: EngineConfig,
    patch: Patch,
    version: u64,
    commands: Producer<EngineCommand>,
    events: Consumer<EngineEvent>,
    bindings: [Option<Binding>; 128],
    stats: Arc<EngineStats>,
}

impl Controller {
    pub(super) fn new(
        config: EngineConfig,
        patch: Patch,
        version: u64,
        commands: Producer<EngineCommand>,
        events: Consumer<EngineEvent>,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            config,
            patch,
            version,
            commands,
            events,
            bindings: [None; 128],
            stats,
        }
    }

    /// The patch as the engine will see it after pending commands apply.
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Blocks that overran their deadline, including any whose event was
    /// dropped on a full ring.
    pub fn deadline_misses(&self) -> u64 {
        self.stats.deadline_misses()
    }

    pub fn voices_stolen(&self) -> u64 {
        self.stats.voices_stolen()
    }

    fn send(&mut self, command: EngineCommand) -> Result<(), ControlError> {
        self.commands.push(command).map_err(|_| {
            warn!("command queue full, dropping command");
            ControlError::QueueFull
        })
    }

    /// Start a note. Zero velocity is a note-off, as in MIDI.
    pub fn note_on(
        &mut self,
        pitch: u8,
        velocity: impl Into<Velocity>,
        timestamp: u64,
    ) -> Result<(), ControlError> {
        let velocity = velocity.into().to_unit();
        if velocity == 0.0 {
            return self.note_off(pitch, timestamp);
        }
        self.send(EngineCommand::NoteOn {
            note: pitch.min(127),
            velocity,
            timestamp,
        })
    }

    pub fn note_off(&mut self, pitch: u8, timestamp: u64) -> Result<(), ControlError> {
        self.send(EngineCommand::NoteOff {
            note: pitch.min(127),
            timestamp,
        })
    }

    /// Bend all voices; `value` in -1.0..=1.0 spans the configured range.
    pub fn pitch_bend(&mut self, value: f32) -> Result<(), ControlError> {
        self.send(EngineCommand::PitchBend { value })
    }

    /// Built-in controllers go to the engine; bound controllers set their
    /// parameter; anything else is ignored.
    pub fn control_change(&mut self, controller: u8, value: u8) -> Result<(), ControlError> {
        let value = value.min(127);
        if let Some(binding) = self.bindings.get(usize::from(controller)).copied().flatten() {
            let spec = self.patch.module(binding.module)?;
            let index = spec.param_index(binding.param)?;
            let mapped = spec.params.specs()[index].from_normalized(f32::from(value) / 127.0);
            return self
                .set_parameter(binding.module, binding.param, mapped)
                .map(|_| ());
        }
        if is_builtin_control(controller) {
            return self.send(EngineCommand::ControlChange { controller, value });
        }
        debug!("ignoring unbound controller {controller}");
        Ok(())
    }

    /// Map `controller` onto a parameter's full range, along its curve.
    pub fn bind_control(
        &mut self,
        controller: u8,
        module: ModuleId,
        param: &str,
    ) -> Result<(), ControlError> {
        let spec = self.patch.module(module)?;
        let index = spec.param_index(param)?;
        let name = spec.params.specs()[index].name;
        if let Some(slot) = self.bindings.get_mut(usize::from(controller)) {
            *slot = Some(Binding {
                module,
                param: name,
            });
            debug!("controller {controller} bound to {module}.{name}");
        }
        Ok(())
    }

    pub fn unbind_control(&mut self, controller: u8) {
        if let Some(slot) = self.bindings.get_mut(usize::from(controller)) {
            *slot = None;
        }
    }

    /// Set a parameter's base value. Returns the clamped value.
    pub fn set_parameter(
        &mut self,
        module: ModuleId,
        param: &str,
        value: f32,
    ) -> Result<f32, ControlError> {
        let (location, index) = self.patch.resolve_parameter(module, param)?;
        let value = self.patch.module(module)?.params.specs()[index].clamp(value);
        self.send(EngineCommand::SetParameter {
            location,
            param: index,
            value,
        })?;
        self.patch.set_parameter(module, param, value)?;
        debug!("{module}.{param} = {value}");
        Ok(value)
    }

    pub fn set_master_volume(&mut self, volume: f32) -> Result<(), ControlError> {
        self.send(EngineCommand::SetMasterVolume(volume))
    }

    pub fn connect(
        &mut self,
        source: ModuleId,
        destination: ModuleId,
        param: &str,
        depth: f32,
    ) -> Result<(), ControlError> {
        self.connect_output(source, 0, destination, param, depth)
    }

    pub fn connect_output(
        &mut self,
        source: ModuleId,
        output: usize,
        destination: ModuleId,
        param: &str,
        depth: f32,
    ) -> Result<(), ControlError> {
        self.edit("connect", Rebuild::VoiceGraph, |patch| {
            patch.connect_output(source, output, destination, param, depth)
        })
    }

    pub fn disconnect(
        &mut self,
        source: ModuleId,
        destination: ModuleId,
        param: &str,
    ) -> Result<(), ControlError> {
        self.edit("disconnect", Rebuild::VoiceGraph, |patch| {
            patch.disconnect(source, destination, param)
        })
    }

    /// Append a module to the voice pipeline. New notes pick it up.
    pub fn add_module(&mut self, shape: ModuleShape) -> Result<ModuleId, ControlError> {
        self.edit("add module", Rebuild::VoiceGraph, |patch| {
            patch.add_module(shape)
        })
    }

    /// Append a global effect. The chain is rebuilt with fresh state.
    pub fn add_effect(&mut self, effect: EffectType) -> Result<ModuleId, ControlError> {
        self.edit("add effect", Rebuild::Effects, |patch| patch.add_effect(effect))
    }

    pub fn remove_module(&mut self, module: ModuleId) -> Result<ModuleSpec, ControlError> {
        let rebuild = match self.patch.locate(module)? {
            ModuleLocation::Voice(_) => Rebuild::VoiceGraph,
            ModuleLocation::Global(_) => Rebuild::Effects,
        };
        let removed = self.edit("remove module", rebuild, |patch| patch.remove_module(module))?;
        for slot in &mut self.bindings {
            if slot.is_some_and(|b| b.module == module) {
                *slot = None;
            }
        }
        Ok(removed)
    }

    /// Replace the whole patch.
    pub fn load(&mut self, patch: Patch) -> Result<(), ControlError> {
        // Both swaps or neither
        if self.commands.slots() < 2 {
            warn!("command queue full, patch not loaded");
            return Err(ControlError::QueueFull);
        }
        let graph = Arc::new(patch.voice_graph(self.version + 1));
        let effects = Box::new(patch.effects_chain(self.config.sample_rate));
        self.send(EngineCommand::SwapGraph(graph))?;
        self.send(EngineCommand::SwapEffects(effects))?;
        self.version += 1;
        self.patch = patch;
        self.bindings = [None; 128];
        debug!("patch loaded as version {}", self.version);
        Ok(())
    }

    fn edit<T>(
        &mut self,
        what: &str,
        rebuild: Rebuild,
        change: impl FnOnce(&mut Patch) -> Result<T, PatchError>,
    ) -> Result<T, ControlError> {
        let mut next = self.patch.clone();
        let output = change(&mut next).map_err(|err| {
            warn!("{what} rejected: {err}");
            err
        })?;

        let command = match rebuild {
            Rebuild::VoiceGraph => {
                EngineCommand::SwapGraph(Arc::new(next.voice_graph(self.version + 1)))
            }
            Rebuild::Effects => {
                EngineCommand::SwapEffects(Box::new(next.effects_chain(self.config.sample_rate)))
            }
        };
        self.send(command)?;

        self.version += 1;
        self.patch = next;
        debug!(
            "{what} applied: version {}, {} modules, {} connections, {} effects",
            self.version,
            self.patch.modules().len(),
            self.patch.connections().len(),
            self.patch.effects().len()
        );
        Ok(output)
    }

    pub fn all_notes_off(&mut self) -> Result<(), ControlError> {
        self.send(EngineCommand::AllNotesOff)
    }

    /// Release every voice, or fade them out over `stop_fade_ms` when
    /// `immediate`.
    pub fn stop(&mut self, immediate: bool) -> Result<(), ControlError> {
        self.send(EngineCommand::Stop { immediate })
    }

    /// Forward a MIDI message received on `channel`.
    pub fn send_midi(&mut self, event: MidiEvent, channel: u8, timestamp: u64) -> Result<(), ControlError> {
        if let MidiEvent::ControlChange {
            channel: ch,
            controller,
            value,
        } = event
        {
            if ch == channel {
                return self.control_change(controller, value);
            }
            return Ok(());
        }
        match midi_to_command(event, channel, timestamp) {
            Some(command) => self.send(command),
            None => Ok(()),
        }
    }

    /// Drain render-side events. Retired values are dropped here, on the
    /// control thread; the rest are returned.
    pub fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.pop() {
            match event {
                EngineEvent::Retired(retired) => {
                    debug!("dropping retired {retired:?}");
                }
                EngineEvent::DeadlineMiss {
                    block,
                    elapsed,
                    budget,
                } => {
                    warn!("block {block} missed its deadline: {elapsed:?} > {budget:?}");
                    out.push(event);
                }
                EngineEvent::VoiceStolen { .. } => out.push(event),
            }
        }
        out
    }
}
