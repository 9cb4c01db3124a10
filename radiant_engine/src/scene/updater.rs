/// Updater — per-frame CPU maintenance, run before any GPU recording.
///
/// For every dirty transform it refreshes the world bounding box,
/// keeps the dynamic BVH in step (insert on first sight, update on
/// movement, remove when the mesh goes away), flags the static index
/// when an immovable entity changed, and pushes TLAS transform deltas.
/// Dirty bits age across frames in flight so per-frame GPU copies all
/// get refreshed before the bit clears.

use crate::error::Result;
use crate::scene::components::TransformSource;
use super::scene::Scene;

pub struct Updater;

impl Updater {
    /// Run one frame of maintenance. `frames_in_flight` drives the
    /// dirty-bit ageing.
    pub fn run(scene: &mut Scene, frames_in_flight: u32) -> Result<()> {
        Self::refresh_bounds_and_indexes(scene);

        // TLAS transform deltas for entities still flagged dirty.
        scene.update_tlas()?;

        // Age dirty bits last so this frame's consumers saw them.
        for (_, record) in scene.entities_mut() {
            record.transform.age_dirty(frames_in_flight);
        }

        if scene.static_dirty() {
            scene.build_static_index();
        }
        Ok(())
    }

    fn refresh_bounds_and_indexes(scene: &mut Scene) {
        // Collect first: the dynamic index borrows the scene mutably.
        let mut dynamic_updates = Vec::new();
        let mut dynamic_removals = Vec::new();

        for (key, record) in scene.entities_mut() {
            let dirty = record.transform.is_dirty();
            let matrix = record.transform.matrix();

            if dirty {
                if let Some(bounds) = record.bounding_box.as_mut() {
                    bounds.refresh(&matrix);
                }
            }

            let movable = record
                .mesh
                .as_ref()
                .is_some_and(|mesh| !mesh.is_static && mesh.is_enabled && !mesh.loading);
            let world = record.bounding_box.as_ref().map(|bounds| bounds.world);

            match (movable, world, record.dynamic_node) {
                // Known to the index: push the new box when dirty.
                (true, Some(world), Some(node)) if dirty => {
                    dynamic_updates.push((key, node, world, false));
                }
                // First sight of a movable entity with bounds.
                (true, Some(world), None) => {
                    dynamic_updates.push((key, 0, world, true));
                }
                // No longer eligible: drop the leaf.
                (false, _, Some(_)) | (true, None, Some(_)) => {
                    dynamic_removals.push(key);
                }
                _ => {}
            }
        }

        for key in dynamic_removals {
            scene.dynamic_index_mut().remove_entity(key);
            if let Some(record) = scene.entity_mut(key) {
                record.dynamic_node = None;
            }
        }

        for (key, node, world, is_new) in dynamic_updates {
            let node = if is_new {
                scene.dynamic_index_mut().insert(key, world)
            } else {
                scene.dynamic_index_mut().update(node, world);
                node
            };
            // `update` relocates in place, so the id is unchanged; a
            // fresh insert stores its new leaf id.
            if let Some(record) = scene.entity_mut(key) {
                record.dynamic_node = Some(node);
            }
        }
    }
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
