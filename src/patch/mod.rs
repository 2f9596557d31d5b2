//! Patch: the per-voice module pipeline, its modulation connections and the
//! global effects chain.
//!
//! A `Patch` is an ordinary value owned by the control side. Every structural
//! edit is validated here and rejected without touching the patch; the
//! engine only ever sees immutable [`VoiceGraph`] snapshots and freshly built
//! [`EffectsChain`]s derived from it.

pub mod routing;
pub mod topology;

use std::collections::BTreeMap;

use crate::{
    effects::{EffectType, EffectsChain, MAX_EFFECTS},
    error::PatchError,
    module::{ModuleId, ModuleShape, ModuleSpec, ModuleType},
};

pub use routing::{Connection, RoutingTable, VoiceGraph};
pub use topology::{ConnectionDescriptor, ModuleDescriptor, PatchTopology};

/// Maximum number of modules in the per-voice pipeline.
pub const MAX_MODULES: usize = 32;

/// Where a module lives: index into the voice pipeline or the effects chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleLocation {
    Voice(usize),
    Global(usize),
}

#[derive(Debug, Clone)]
pub struct Patch {
    modules: Vec<ModuleSpec>,
    effects: Vec<ModuleSpec>,
    connections: Vec<Connection>,
    next_id: u32,
}

impl Default for Patch {
    fn default() -> Self {
        Self::new()
    }
}

impl Patch {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            effects: Vec::new(),
            connections: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ModuleId {
        let id = ModuleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a module to the per-voice pipeline.
    pub fn add_module(&mut self, shape: ModuleShape) -> Result<ModuleId, PatchError> {
        if self.modules.len() >= MAX_MODULES {
            return Err(PatchError::PipelineFull { limit: MAX_MODULES });
        }
        let id = self.allocate_id();
        self.modules.push(ModuleSpec::new(id, shape));
        Ok(id)
    }

    /// Append an effect to the global, post-mix chain.
    pub fn add_effect(&mut self, effect: EffectType) -> Result<ModuleId, PatchError> {
        if self.effects.len() >= MAX_EFFECTS {
            return Err(PatchError::PipelineFull { limit: MAX_EFFECTS });
        }
        let id = self.allocate_id();
        self.effects
            .push(ModuleSpec::new(id, ModuleShape::Effect(effect)));
        Ok(id)
    }

    /// Remove a module from either list, along with every connection that
    /// touches it.
    pub fn remove_module(&mut self, id: ModuleId) -> Result<ModuleSpec, PatchError> {
        let removed = match self.locate(id)? {
            ModuleLocation::Voice(index) => self.modules.remove(index),
            ModuleLocation::Global(index) => self.effects.remove(index),
        };
        self.connections
            .retain(|c| c.source != id && c.destination != id);
        Ok(removed)
    }

    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    pub fn effects(&self) -> &[ModuleSpec] {
        &self.effects
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn locate(&self, id: ModuleId) -> Result<ModuleLocation, PatchError> {
        if let Some(index) = self.modules.iter().position(|m| m.id == id) {
            return Ok(ModuleLocation::Voice(index));
        }
        if let Some(index) = self.effects.iter().position(|m| m.id == id) {
            return Ok(ModuleLocation::Global(index));
        }
        Err(PatchError::UnknownModule(id))
    }

    pub fn module(&self, id: ModuleId) -> Result<&ModuleSpec, PatchError> {
        Ok(match self.locate(id)? {
            ModuleLocation::Voice(index) => &self.modules[index],
            ModuleLocation::Global(index) => &self.effects[index],
        })
    }

    fn module_mut(&mut self, id: ModuleId) -> Result<&mut ModuleSpec, PatchError> {
        Ok(match self.locate(id)? {
            ModuleLocation::Voice(index) => &mut self.modules[index],
            ModuleLocation::Global(index) => &mut self.effects[index],
        })
    }

    /// Resolve a `(module, parameter name)` pair to positions.
    pub fn resolve_parameter(
        &self,
        id: ModuleId,
        name: &str,
    ) -> Result<(ModuleLocation, usize), PatchError> {
        let location = self.locate(id)?;
        let index = self.module(id)?.param_index(name)?;
        Ok((location, index))
    }

    /// Set a base parameter value. Returns the clamped value stored.
    pub fn set_parameter(&mut self, id: ModuleId, name: &str, value: f32) -> Result<f32, PatchError> {
        self.module_mut(id)?.set_param(name, value)
    }

    pub fn parameter(&self, id: ModuleId, name: &str) -> Result<f32, PatchError> {
        let spec = self.module(id)?;
        Ok(spec.params.base(spec.param_index(name)?))
    }

    /// Connect output channel 0 of `source` to `destination.param`.
    pub fn connect(
        &mut self,
        source: ModuleId,
        destination: ModuleId,
        param: &str,
        depth: f32,
    ) -> Result<(), PatchError> {
        self.connect_output(source, 0, destination, param, depth)
    }

    /// Connect a specific output channel. Re-connecting the same route only
    /// replaces its depth.
    pub fn connect_output(
        &mut self,
        source: ModuleId,
        output: usize,
        destination: ModuleId,
        param: &str,
        depth: f32,
    ) -> Result<(), PatchError> {
        let source_shape = self.routable(source)?.shape;
        let dest = self.routable(destination)?;
        if output >= source_shape.output_count() {
            return Err(PatchError::UnknownOutput {
                module: source,
                output,
            });
        }
        let param_index = dest.param_index(param)?;
        let connection = Connection {
            source,
            output,
            destination,
            param: dest.params.specs()[param_index].name,
            depth: routing::clamp_depth(depth),
        };

        if let Some(existing) = self
            .connections
            .iter_mut()
            .find(|c| c.same_route(&connection))
        {
            existing.depth = connection.depth;
            return Ok(());
        }

        let is_control = |id: ModuleId| {
            self.modules
                .iter()
                .any(|m| m.id == id && m.shape.is_control_rate())
        };
        if routing::creates_cycle(&self.connections, source, destination, is_control) {
            return Err(PatchError::CyclicRouting {
                from: source,
                to: destination,
            });
        }

        self.connections.push(connection);
        Ok(())
    }

    /// Remove every connection from `source` to `destination.param`.
    pub fn disconnect(
        &mut self,
        source: ModuleId,
        destination: ModuleId,
        param: &str,
    ) -> Result<(), PatchError> {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.source == source && c.destination == destination && c.param == param));
        if self.connections.len() == before {
            return Err(PatchError::UnknownConnection {
                from: source,
                to: destination,
                param: param.to_string(),
            });
        }
        Ok(())
    }

    fn routable(&self, id: ModuleId) -> Result<&ModuleSpec, PatchError> {
        match self.locate(id)? {
            ModuleLocation::Voice(index) => Ok(&self.modules[index]),
            ModuleLocation::Global(_) => Err(PatchError::NotRoutable(id)),
        }
    }

    /// Immutable snapshot for voices.
    pub fn voice_graph(&self, version: u64) -> VoiceGraph {
        VoiceGraph::new(version, self.modules.clone(), &self.connections)
    }

    /// Fresh global chain with its own effect state.
    pub fn effects_chain(&self, sample_rate: f32) -> EffectsChain {
        EffectsChain::from_specs(&self.effects, sample_rate)
    }

    pub fn to_topology(&self) -> PatchTopology {
        let describe = |spec: &ModuleSpec| ModuleDescriptor {
            id: spec.id,
            module_type: spec.shape.module_type().name().to_string(),
            shape: spec.shape.shape_name().to_string(),
            parameters: spec
                .params
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect::<BTreeMap<_, _>>(),
        };
        PatchTopology {
            modules: self.modules.iter().map(describe).collect(),
            connections: self
                .connections
                .iter()
                .map(|c| ConnectionDescriptor {
                    source: c.source,
                    output: c.output,
                    destination: c.destination,
                    param: c.param.to_string(),
                    depth: c.depth,
                })
                .collect(),
            effects: self.effects.iter().map(describe).collect(),
        }
    }

    /// Validate and rebuild a patch. Ids are preserved; parameters missing
    /// from a descriptor keep their defaults.
    pub fn from_topology(topology: &PatchTopology) -> Result<Self, PatchError> {
        let mut patch = Patch::new();

        let build = |descriptor: &ModuleDescriptor| -> Result<ModuleSpec, PatchError> {
            let shape = ModuleShape::from_names(&descriptor.module_type, &descriptor.shape)?;
            let mut spec = ModuleSpec::new(descriptor.id, shape);
            for (name, &value) in &descriptor.parameters {
                spec.set_param(name, value)?;
            }
            Ok(spec)
        };

        for descriptor in &topology.modules {
            if patch.modules.len() >= MAX_MODULES {
                return Err(PatchError::PipelineFull { limit: MAX_MODULES });
            }
            let spec = build(descriptor)?;
            patch.claim_id(spec.id)?;
            patch.modules.push(spec);
        }
        for descriptor in &topology.effects {
            if patch.effects.len() >= MAX_EFFECTS {
                return Err(PatchError::PipelineFull { limit: MAX_EFFECTS });
            }
            let spec = build(descriptor)?;
            if spec.shape.module_type() != ModuleType::Effect {
                return Err(PatchError::UnknownShape {
                    kind: "global effect",
                    name: descriptor.module_type.clone(),
                });
            }
            patch.claim_id(spec.id)?;
            patch.effects.push(spec);
        }
        for c in &topology.connections {
            patch.connect_output(c.source, c.output, c.destination, &c.param, c.depth)?;
        }
        Ok(patch)
    }

    fn claim_id(&mut self, id: ModuleId) -> Result<(), PatchError> {
        if self.locate(id).is_ok() {
            return Err(PatchError::DuplicateModule(id));
        }
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }
}
