/// Scene — the entity arena plus acceleration-structure registration.
///
/// Entities live in a SlotMap keyed by `EntityKey`. The scene owns the
/// TLAS (instances reference entities by key), the static SAH index
/// over immovable meshes, and the dynamic BVH over movable ones.
/// All GPU resource creation goes through the shared device handle.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::accel::{BoundingBox, DynamicBvh, StaticBvh, StaticLeaf};
use crate::bindless::BindlessIndex;
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::graphics_device::{BlasDesc, GraphicsDevice, Texture, Tlas, TlasInstance};
use crate::passes::SelectionChannel;
use super::components::*;
use super::EntityKey;

/// One entity's components. Every entity has a transform; everything
/// else is optional.
#[derive(Default)]
pub struct EntityRecord {
    pub transform: TransformComponent,
    pub mesh: Option<MeshComponent>,
    pub material: Option<MaterialComponent>,
    pub bounding_box: Option<BoundingBoxComponent>,
    pub light: Option<LightComponent>,
    pub camera: Option<Camera>,
    pub blas: Option<BlasComponent>,
    /// DBVH leaf for movable meshes, maintained by the Updater
    pub(crate) dynamic_node: Option<u32>,
}

/// One renderable entity as the G-buffer pass consumes it.
pub struct DrawItem<'a> {
    pub entity: EntityKey,
    pub transform: &'a dyn TransformSource,
    pub mesh: &'a dyn MeshSource,
    pub material: &'a dyn MaterialSource,
    pub world_aabb: BoundingBox,
}

pub struct Scene {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    entities: SlotMap<EntityKey, EntityRecord>,
    tlas: Option<Arc<Mutex<dyn Tlas>>>,
    /// Instance list changed since the last `build_tlas`
    tlas_dirty: bool,
    static_index: StaticBvh,
    static_dirty: bool,
    dynamic_index: DynamicBvh,
    main_camera: Option<EntityKey>,
    selection: SelectionChannel,
    skybox_texture: Option<Arc<dyn Texture>>,
}

impl Scene {
    pub fn new(device: Arc<Mutex<dyn GraphicsDevice>>) -> Self {
        Self {
            device,
            entities: SlotMap::with_key(),
            tlas: None,
            tlas_dirty: false,
            static_index: StaticBvh::build(&[]),
            static_dirty: false,
            dynamic_index: DynamicBvh::new(),
            main_camera: None,
            selection: SelectionChannel::new(),
            skybox_texture: None,
        }
    }

    // ===== ENTITIES =====

    pub fn create_entity(&mut self) -> EntityKey {
        self.entities.insert(EntityRecord::default())
    }

    /// Destroy an entity and detach it from every index. Returns false
    /// for an unknown key.
    pub fn destroy_entity(&mut self, entity: EntityKey) -> bool {
        let Some(record) = self.entities.remove(entity) else {
            return false;
        };

        if record.dynamic_node.is_some() {
            self.dynamic_index.remove_entity(entity);
        }
        if record
            .blas
            .as_ref()
            .is_some_and(|blas| blas.registered)
        {
            self.tlas_dirty = true;
        }
        if record.mesh.as_ref().is_some_and(|mesh| mesh.is_static) {
            self.static_dirty = true;
        }
        if self.main_camera == Some(entity) {
            self.main_camera = None;
        }
        if self.selection.current() == Some(entity) {
            self.selection.publish(None);
        }
        true
    }

    pub fn entity(&self, entity: EntityKey) -> Option<&EntityRecord> {
        self.entities.get(entity)
    }

    pub fn entity_mut(&mut self, entity: EntityKey) -> Option<&mut EntityRecord> {
        self.entities.get_mut(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub(crate) fn entities_mut(
        &mut self,
    ) -> impl Iterator<Item = (EntityKey, &mut EntityRecord)> {
        self.entities.iter_mut()
    }

    // ===== COMPONENT SETTERS =====

    pub fn set_mesh(&mut self, entity: EntityKey, mesh: MeshComponent) -> bool {
        let Some(record) = self.entities.get_mut(entity) else {
            return false;
        };
        if mesh.is_static {
            self.static_dirty = true;
        }
        record.mesh = Some(mesh);
        true
    }

    pub fn set_material(&mut self, entity: EntityKey, material: MaterialComponent) -> bool {
        match self.entities.get_mut(entity) {
            Some(record) => {
                record.material = Some(material);
                true
            }
            None => false,
        }
    }

    pub fn set_local_bounds(&mut self, entity: EntityKey, local: BoundingBox) -> bool {
        let Some(record) = self.entities.get_mut(entity) else {
            return false;
        };
        let mut bounds = BoundingBoxComponent::new(local);
        bounds.refresh(&record.transform.matrix());
        record.bounding_box = Some(bounds);
        if record.mesh.as_ref().is_some_and(|mesh| mesh.is_static) {
            self.static_dirty = true;
        }
        true
    }

    pub fn set_light(&mut self, entity: EntityKey, light: LightComponent) -> bool {
        match self.entities.get_mut(entity) {
            Some(record) => {
                record.light = Some(light);
                true
            }
            None => false,
        }
    }

    pub fn set_camera(&mut self, entity: EntityKey, camera: Camera) -> bool {
        match self.entities.get_mut(entity) {
            Some(record) => {
                record.camera = Some(camera);
                true
            }
            None => false,
        }
    }

    pub fn set_main_camera(&mut self, entity: EntityKey) {
        self.main_camera = Some(entity);
    }

    /// Main camera, if one is assigned and still alive.
    pub fn main_camera(&self) -> Option<&Camera> {
        self.entities
            .get(self.main_camera?)
            .and_then(|record| record.camera.as_ref())
    }

    pub fn main_camera_mut(&mut self) -> Option<&mut Camera> {
        self.entities
            .get_mut(self.main_camera?)
            .and_then(|record| record.camera.as_mut())
    }

    pub fn set_skybox(&mut self, texture: Option<Arc<dyn Texture>>) {
        self.skybox_texture = texture;
    }

    /// Bindless index of the skybox cubemap, or null when disabled.
    pub fn skybox_index(&self) -> BindlessIndex {
        self.skybox_texture
            .as_ref()
            .map(|texture| texture.bindless_index())
            .unwrap_or(BindlessIndex::NULL)
    }

    /// Selection channel shared with the editor host.
    pub fn selection(&self) -> &SelectionChannel {
        &self.selection
    }

    // ===== ACCELERATION STRUCTURES =====

    /// Build a BLAS for an entity's mesh.
    ///
    /// Requires a mesh component; loading meshes are rejected. On any
    /// failure the entity remains without a BLAS component and the
    /// error propagates to the caller.
    pub fn register_blas(&mut self, entity: EntityKey) -> Result<()> {
        let record = self
            .entities
            .get(entity)
            .ok_or_else(|| Error::Build(format!("register_blas: unknown entity {:?}", entity)))?;
        let mesh = record
            .mesh
            .as_ref()
            .ok_or_else(|| Error::Build(format!("register_blas: {:?} has no mesh", entity)))?;
        if mesh.loading {
            return Err(Error::Build(format!(
                "register_blas: {:?} mesh is still loading",
                entity
            )));
        }

        let desc = BlasDesc {
            name: format!("blas_{:?}", entity),
            vertex_buffer: mesh.vertex_buffer.clone(),
            vertex_count: mesh.vertex_count,
            vertex_stride: mesh.vertex_stride,
            position_offset: mesh.position_offset,
            index_buffer: mesh.index_buffer.clone(),
            index_count: mesh.index_count,
            index_type: mesh.index_type,
        };

        let blas = self.device.lock().unwrap().create_blas(desc)?;
        // The entity is known to exist; re-borrow mutably to attach.
        if let Some(record) = self.entities.get_mut(entity) {
            record.blas = Some(BlasComponent {
                blas,
                registered: false,
                tlas_instance_index: None,
            });
        }
        Ok(())
    }

    /// Register an entity's BLAS with the scene TLAS. Takes effect at
    /// the next `build_tlas`.
    pub fn register_tlas_instance(&mut self, entity: EntityKey) -> Result<()> {
        let record = self.entities.get_mut(entity).ok_or_else(|| {
            Error::Precondition(format!("register_tlas_instance: unknown entity {:?}", entity))
        })?;
        let blas = record.blas.as_mut().ok_or_else(|| {
            Error::Precondition(format!("register_tlas_instance: {:?} has no BLAS", entity))
        })?;
        blas.registered = true;
        self.tlas_dirty = true;
        Ok(())
    }

    /// Rebuild the TLAS over every registered instance.
    ///
    /// Fails with a build error when no instances are registered. The
    /// TLAS keeps its bindless index across rebuilds.
    pub fn build_tlas(&mut self) -> Result<()> {
        if self.tlas.is_none() {
            self.tlas = Some(self.device.lock().unwrap().create_tlas()?);
        }
        let tlas = self.tlas.as_ref().unwrap().clone();
        let mut tlas_guard = tlas.lock().unwrap();

        tlas_guard.clear();
        let mut next_index = 0usize;
        for (key, record) in self.entities.iter_mut() {
            let Some(blas) = record.blas.as_mut() else {
                continue;
            };
            if !blas.registered {
                continue;
            }
            if record
                .mesh
                .as_ref()
                .is_some_and(|mesh| !mesh.is_enabled || mesh.loading)
            {
                blas.tlas_instance_index = None;
                continue;
            }

            tlas_guard.add_instance(TlasInstance {
                blas: blas.blas.clone(),
                transform: record.transform.matrix(),
                entity: key,
            });
            blas.tlas_instance_index = Some(next_index);
            next_index += 1;
        }

        tlas_guard.build()?;
        self.tlas_dirty = false;
        Ok(())
    }

    /// Push transform deltas for dirty instances into the TLAS.
    /// Called once per frame; a no-op until the TLAS is built.
    pub fn update_tlas(&mut self) -> Result<()> {
        let Some(tlas) = self.tlas.as_ref() else {
            return Ok(());
        };
        let tlas = tlas.clone();
        let mut tlas_guard = tlas.lock().unwrap();
        if !tlas_guard.is_built() {
            return Ok(());
        }

        let mut updates = Vec::new();
        for (_, record) in self.entities.iter() {
            let Some(blas) = record.blas.as_ref() else {
                continue;
            };
            let Some(index) = blas.tlas_instance_index else {
                continue;
            };
            if record.transform.is_dirty() {
                updates.push((index, record.transform.matrix()));
            }
        }

        if !updates.is_empty() {
            tlas_guard.update_instances(&updates)?;
        }
        Ok(())
    }

    pub fn tlas(&self) -> Option<&Arc<Mutex<dyn Tlas>>> {
        self.tlas.as_ref()
    }

    /// Instance set changed since the last build.
    pub fn tlas_dirty(&self) -> bool {
        self.tlas_dirty
    }

    // ===== SPATIAL INDEXES =====

    /// Rebuild the static SAH index over immovable meshes. Cheap to
    /// skip when nothing changed.
    pub fn build_static_index(&mut self) {
        let leaves: Vec<StaticLeaf> = self
            .entities
            .iter()
            .filter_map(|(key, record)| {
                let mesh = record.mesh.as_ref()?;
                if !mesh.is_static || !mesh.is_enabled || mesh.loading {
                    return None;
                }
                let bounds = record.bounding_box.as_ref()?;
                bounds.world.is_valid().then(|| StaticLeaf {
                    aabb: bounds.world,
                    entity: key,
                })
            })
            .collect();

        self.static_index = StaticBvh::build(&leaves);
        self.static_dirty = false;
        crate::engine_debug!(
            "radiant::Scene",
            "static index rebuilt over {} primitives",
            leaves.len()
        );
    }

    /// The static set changed since the last `build_static_index`.
    pub fn static_dirty(&self) -> bool {
        self.static_dirty
    }

    pub fn static_index(&self) -> &StaticBvh {
        &self.static_index
    }

    pub fn dynamic_index(&self) -> &DynamicBvh {
        &self.dynamic_index
    }

    pub(crate) fn dynamic_index_mut(&mut self) -> &mut DynamicBvh {
        &mut self.dynamic_index
    }

    /// Entities from both indexes whose world AABB overlaps the query.
    pub fn query_overlap(&self, aabb: &BoundingBox) -> FxHashSet<EntityKey> {
        let mut results = self.static_index.query_overlap(aabb);
        results.extend(self.dynamic_index.query_overlap(aabb));
        results
    }

    // ===== FRAME DATA =====

    /// Active lights, in arena order.
    pub fn active_lights(&self) -> Vec<LightComponent> {
        self.entities
            .iter()
            .filter_map(|(_, record)| record.light)
            .filter(|light| light.is_active)
            .collect()
    }

    /// Renderable entities: enabled non-loading mesh, ready material,
    /// and a bounding box for culling.
    pub fn draw_items(&self) -> Vec<DrawItem<'_>> {
        self.entities
            .iter()
            .filter_map(|(key, record)| {
                let mesh = record.mesh.as_ref()?;
                if !mesh.is_enabled || mesh.loading {
                    return None;
                }
                let material = record.material.as_ref()?;
                if !material.ready {
                    return None;
                }
                let bounds = record.bounding_box.as_ref()?;

                Some(DrawItem {
                    entity: key,
                    transform: &record.transform,
                    mesh,
                    material,
                    world_aabb: bounds.world,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
