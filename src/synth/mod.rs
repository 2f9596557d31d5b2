// Purpose: voices, polyphony, and the messages that cross the
// control/render boundary

pub mod allocator;
pub mod message;
pub mod voice;

pub use allocator::{Allocation, VoicePool};
pub use message::{EngineCommand, EngineEvent, Retired, Velocity};
pub use voice::{Voice, VoiceState};
