//! Factory patches.
//!
//! Each preset is an ordinary [`Patch`]: a voice pipeline, its modulation
//! connections and a global effects chain. Load one with
//! [`engine::create`](crate::engine::create) or
//! [`Controller::load`](crate::engine::Controller::load), then tweak it like
//! any other patch.
//!
//! # Example
//!
//! ```ignore
//! use patchbay::{engine, presets, EngineConfig};
//!
//! let (engine, controller) = engine::create(EngineConfig::default(), presets::pad())?;
//! ```

mod bass;
mod keys;
mod lead;
mod pad;
mod pluck;

pub use bass::bass;
pub use keys::keys;
pub use lead::lead;
pub use pad::pad;
pub use pluck::pluck;

use crate::{error::PatchError, patch::Patch};

pub const NAMES: [&str; 5] = ["lead", "bass", "pad", "pluck", "keys"];

pub fn by_name(name: &str) -> Option<Patch> {
    Some(match name {
        "lead" => lead(),
        "bass" => bass(),
        "pad" => pad(),
        "pluck" => pluck(),
        "keys" => keys(),
        _ => return None,
    })
}

fn build(name: &str, recipe: impl FnOnce(&mut Patch) -> Result<(), PatchError>) -> Patch {
    let mut patch = Patch::new();
    if let Err(err) = recipe(&mut patch) {
        debug_assert!(false, "preset {name} is invalid: {err}");
        log::error!("preset {name} is invalid: {err}");
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_builds_and_round_trips() {
        for name in NAMES {
            let patch = by_name(name).unwrap();
            assert!(!patch.modules().is_empty(), "{name} has no modules");
            let topology = patch.to_topology();
            let rebuilt = Patch::from_topology(&topology).unwrap();
            assert_eq!(rebuilt.to_topology(), topology, "{name} did not round-trip");
        }
        assert!(by_name("theremin").is_none());
    }
}
