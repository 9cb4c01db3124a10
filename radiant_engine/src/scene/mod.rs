/// Scene module - entity arena, component records, and per-frame
/// maintenance.
///
/// Back-references between subsystems are ids, never owning handles:
/// the BVH/DBVH store node indices, the TLAS stores entity keys, and
/// the scene owns the arena.

pub mod components;
pub mod scene;
pub mod updater;

use slotmap::new_key_type;

new_key_type! {
    /// Stable key for an entity within a Scene.
    ///
    /// Keys remain valid until their entity is destroyed; destroying
    /// other entities never invalidates them.
    pub struct EntityKey;
}

pub use components::*;
pub use scene::{DrawItem, EntityRecord, Scene};
pub use updater::Updater;
