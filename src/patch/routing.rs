//! Modulation routing.
//!
//! Connections are stored by module id in the patch and compiled into a
//! [`RoutingTable`] of plain indices when a voice-graph snapshot is built, so
//! the render thread never searches by id or name.

/*
Control-Rate Ordering
=====================

An edge is control-rate when its source is an LFO or an envelope. Those
modules are advanced before any audio is produced, one at a time, in a
topological order of the control-rate edges:

    LFO 1 ──rate──→ LFO 2 ──cutoff──→ Filter
      │
      └──attack──→ Env

    control order: LFO 1, LFO 2, Env      (ties by pipeline position)

so LFO 2 sees the value LFO 1 produced for this same block. A cycle among
control-rate edges (including a self-loop such as an LFO driving its own
rate) has no such order and is rejected when the connection is made.

Edges from audio-rate sources (oscillator, filter, effect) carry the
source's previous-block average, so they never constrain ordering.
*/

use crate::module::{params::MAX_PARAMS, Module, ModuleId, ModuleSpec};

/// One modulation edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub source: ModuleId,
    pub output: usize,
    pub destination: ModuleId,
    pub param: &'static str,
    pub depth: f32,
}

impl Connection {
    /// Same endpoints, ignoring depth.
    pub fn same_route(&self, other: &Connection) -> bool {
        self.source == other.source
            && self.output == other.output
            && self.destination == other.destination
            && self.param == other.param
    }
}

/// Clamp a connection depth into [-1, 1]. NaN becomes zero.
#[inline]
pub fn clamp_depth(depth: f32) -> f32 {
    if depth.is_nan() {
        0.0
    } else {
        depth.clamp(-1.0, 1.0)
    }
}

/// True if adding `source → destination` closes a loop among control-rate
/// edges. `is_control` reports whether a module id is a control-rate module.
pub fn creates_cycle(
    connections: &[Connection],
    source: ModuleId,
    destination: ModuleId,
    is_control: impl Fn(ModuleId) -> bool,
) -> bool {
    if !is_control(source) {
        return false;
    }
    if source == destination {
        return true;
    }

    // Depth-first search from the destination along control-rate edges
    let mut stack = vec![destination];
    let mut visited = Vec::new();
    while let Some(node) = stack.pop() {
        if node == source {
            return true;
        }
        if visited.contains(&node) {
            continue;
        }
        visited.push(node);
        stack.extend(
            connections
                .iter()
                .filter(|c| c.source == node && is_control(c.source))
                .map(|c| c.destination),
        );
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Route {
    source: usize,
    output: usize,
    param: usize,
    depth: f32,
}

/// Index-based routing for one voice-graph snapshot.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
    // Per destination module: range into `routes`
    spans: Vec<(usize, usize)>,
    control_order: Vec<usize>,
}

impl RoutingTable {
    /// Compile connections against the pipeline. Connections that no longer
    /// resolve are skipped.
    pub fn compile(modules: &[ModuleSpec], connections: &[Connection]) -> Self {
        let index_of = |id: ModuleId| modules.iter().position(|m| m.id == id);

        let mut routes = Vec::new();
        let mut spans = Vec::with_capacity(modules.len());
        for (dest_index, dest) in modules.iter().enumerate() {
            let start = routes.len();
            for connection in connections.iter().filter(|c| c.destination == dest.id) {
                let (Some(source), Some(param)) =
                    (index_of(connection.source), dest.params.index_of(connection.param))
                else {
                    continue;
                };
                debug_assert!(param < MAX_PARAMS);
                routes.push(Route {
                    source,
                    output: connection.output,
                    param,
                    depth: connection.depth,
                });
            }
            spans.push((start, routes.len()));
            debug_assert_eq!(spans.len(), dest_index + 1);
        }

        let control_order = Self::sort_control(modules, connections, &index_of);

        Self {
            routes,
            spans,
            control_order,
        }
    }

    /// Kahn's algorithm over control-rate edges between control-rate
    /// modules, always taking the earliest ready module in pipeline order.
    fn sort_control(
        modules: &[ModuleSpec],
        connections: &[Connection],
        index_of: &impl Fn(ModuleId) -> Option<usize>,
    ) -> Vec<usize> {
        let control: Vec<usize> = (0..modules.len())
            .filter(|&i| modules[i].shape.is_control_rate())
            .collect();

        let edges: Vec<(usize, usize)> = connections
            .iter()
            .filter_map(|c| Some((index_of(c.source)?, index_of(c.destination)?)))
            .filter(|&(s, d)| {
                modules[s].shape.is_control_rate() && modules[d].shape.is_control_rate()
            })
            .collect();

        let mut indegree = vec![0usize; modules.len()];
        for &(_, d) in &edges {
            indegree[d] += 1;
        }

        let mut order = Vec::with_capacity(control.len());
        let mut done = vec![false; modules.len()];
        while order.len() < control.len() {
            let next = control
                .iter()
                .copied()
                .find(|&i| !done[i] && indegree[i] == 0)
                // A cycle slipped through; fall back to pipeline order
                .or_else(|| control.iter().copied().find(|&i| !done[i]));
            let Some(next) = next else { break };
            done[next] = true;
            order.push(next);
            for &(s, d) in &edges {
                if s == next && indegree[d] > 0 {
                    indegree[d] -= 1;
                }
            }
        }
        order
    }

    /// Control-rate module indices in evaluation order.
    pub fn control_order(&self) -> &[usize] {
        &self.control_order
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Sum incoming modulation for `index` and freeze its effective values.
    pub fn modulate(&self, index: usize, modules: &mut [Module]) {
        let Some(&(start, end)) = self.spans.get(index) else {
            return;
        };
        if start == end {
            modules[index].params_mut().reset_effective();
            return;
        }
        let mut amounts = [0.0f32; MAX_PARAMS];
        for route in &self.routes[start..end] {
            amounts[route.param] += route.depth * modules[route.source].output(route.output);
        }
        modules[index].params_mut().apply(&amounts);
    }
}

/// Immutable per-voice topology snapshot, shared through an `Arc`.
#[derive(Debug, Clone)]
pub struct VoiceGraph {
    pub version: u64,
    pub modules: Vec<ModuleSpec>,
    pub routing: RoutingTable,
}

impl VoiceGraph {
    pub fn new(version: u64, modules: Vec<ModuleSpec>, connections: &[Connection]) -> Self {
        let routing = RoutingTable::compile(&modules, connections);
        Self {
            version,
            modules,
            routing,
        }
    }

    pub fn has_envelope(&self) -> bool {
        self.modules
            .iter()
            .any(|m| m.shape.module_type() == crate::module::ModuleType::Envelope)
    }
}
