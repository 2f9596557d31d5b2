//! Plain-value patch topology handed to persistence collaborators.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::module::ModuleId;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchTopology {
    /// Per-voice pipeline, in processing order.
    pub modules: Vec<ModuleDescriptor>,
    pub connections: Vec<ConnectionDescriptor>,
    /// Global effects, in processing order.
    pub effects: Vec<ModuleDescriptor>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    pub module_type: String,
    pub shape: String,
    pub parameters: BTreeMap<String, f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDescriptor {
    pub source: ModuleId,
    pub output: usize,
    pub destination: ModuleId,
    pub param: String,
    pub depth: f32,
}
