//! Error taxonomy for the control surface.
//!
//! Only structural mistakes are errors: unknown references and routing
//! cycles are rejected at the call site and leave the patch untouched.
//! Out-of-range parameter values are clamped and voice exhaustion is resolved
//! by stealing, so neither shows up here. The render path never returns an
//! error.

use thiserror::Error;

use crate::module::ModuleId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),

    #[error("module {module} has no parameter named `{name}`")]
    UnknownParameter { module: ModuleId, name: String },

    #[error("module {module} has no output channel {output}")]
    UnknownOutput { module: ModuleId, output: usize },

    #[error("no connection from {from} to {to}.{param}")]
    UnknownConnection {
        from: ModuleId,
        to: ModuleId,
        param: String,
    },

    #[error("unknown {kind} `{name}`")]
    UnknownShape { kind: &'static str, name: String },

    #[error("connecting {from} to {to} would create a control-rate cycle")]
    CyclicRouting { from: ModuleId, to: ModuleId },

    #[error("module {0} belongs to the global effects chain and cannot be routed")]
    NotRoutable(ModuleId),

    #[error("module id {0} is used more than once")]
    DuplicateModule(ModuleId),

    #[error("no room for another module (limit {limit})")]
    PipelineFull { limit: usize },
}

impl PatchError {
    /// True for every "no such module / parameter / output / connection" case.
    pub fn is_unknown_reference(&self) -> bool {
        matches!(
            self,
            PatchError::UnknownModule(_)
                | PatchError::UnknownParameter { .. }
                | PatchError::UnknownOutput { .. }
                | PatchError::UnknownConnection { .. }
                | PatchError::UnknownShape { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// The render context has not drained the command ring yet.
    #[error("command queue is full")]
    QueueFull,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be between 8000 and 384000 Hz, got {0}")]
    SampleRate(f32),

    #[error("block size must be between 1 and {max}, got {got}")]
    BlockSize { got: usize, max: usize },

    #[error("channel count must be between 1 and 8, got {0}")]
    Channels(usize),

    #[error("polyphony must be between 1 and 256, got {0}")]
    Polyphony(usize),

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{0} capacity must be non-zero")]
    Capacity(&'static str),
}
