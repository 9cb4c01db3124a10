/// Component records and the source-trait contracts.
///
/// The passes consume entities through small trait contracts
/// (`TransformSource`, `MeshSource`, `MaterialSource`) so any ECS can
/// feed them; the arena components here are one implementation.
/// Missing-component paths return options, never panic.

use std::sync::Arc;
use glam::{Mat4, Quat, Vec3};
use crate::accel::BoundingBox;
use crate::graphics_device::{BindingGroup, Blas, Buffer, IndexType, VertexLayout};
use super::EntityKey;

// ===== SOURCE CONTRACTS =====

/// Transform data as the passes need it.
pub trait TransformSource {
    /// World matrix.
    fn matrix(&self) -> Mat4;
    /// Whether the transform changed and downstream copies are stale.
    fn is_dirty(&self) -> bool;
}

/// Mesh data as the passes need it.
pub trait MeshSource {
    fn vertex_buffer(&self) -> &Arc<dyn Buffer>;
    fn index_buffer(&self) -> &Arc<dyn Buffer>;
    fn index_count(&self) -> u32;
    fn index_type(&self) -> IndexType;
    fn vertex_layout(&self) -> &VertexLayout;
}

/// Material data as the passes need it.
pub trait MaterialSource {
    /// Set-1 binding group with the material's textures and params.
    fn binding_group(&self) -> &Arc<dyn BindingGroup>;
}

// ===== TRANSFORM =====

/// Transform component: TRS plus the cached world matrix.
///
/// `dirty_frame_count` ages the dirty bit across frames in flight so
/// every per-frame copy of dependent GPU data gets refreshed before
/// the bit clears.
#[derive(Debug, Clone)]
pub struct TransformComponent {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    matrix: Mat4,
    dirty: bool,
    dirty_frame_count: u32,
}

impl TransformComponent {
    pub fn new() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            matrix: Mat4::IDENTITY,
            dirty: false,
            dirty_frame_count: 0,
        }
    }

    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let mut transform = Self::new();
        transform.set_trs(translation, rotation, scale);
        transform
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.mark_dirty();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.mark_dirty();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_dirty();
    }

    pub fn set_trs(&mut self, translation: Vec3, rotation: Quat, scale: Vec3) {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.matrix = Mat4::from_scale_rotation_translation(
            self.scale,
            self.rotation,
            self.translation,
        );
        self.dirty = true;
        self.dirty_frame_count = 0;
    }

    /// Age the dirty bit by one frame; clears after `frames_in_flight`
    /// frames so every in-flight copy has been refreshed.
    pub fn age_dirty(&mut self, frames_in_flight: u32) {
        if self.dirty {
            self.dirty_frame_count += 1;
            if self.dirty_frame_count >= frames_in_flight {
                self.dirty = false;
                self.dirty_frame_count = 0;
            }
        }
    }

    pub fn dirty_frame_count(&self) -> u32 {
        self.dirty_frame_count
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformSource for TransformComponent {
    fn matrix(&self) -> Mat4 {
        self.matrix
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

// ===== MESH =====

/// Mesh component: GPU buffers plus the dynamic vertex layout.
#[derive(Clone)]
pub struct MeshComponent {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    pub vertex_count: u32,
    /// Stride between consecutive vertices, bytes
    pub vertex_stride: u32,
    /// Byte offset of the position attribute
    pub position_offset: u32,
    pub index_count: u32,
    pub index_type: IndexType,
    pub layout: VertexLayout,
    /// Static meshes go to the SAH index; movable ones to the DBVH
    pub is_static: bool,
    pub is_enabled: bool,
    /// Still streaming in; ignored by every pass
    pub loading: bool,
}

impl MeshSource for MeshComponent {
    fn vertex_buffer(&self) -> &Arc<dyn Buffer> {
        &self.vertex_buffer
    }

    fn index_buffer(&self) -> &Arc<dyn Buffer> {
        &self.index_buffer
    }

    fn index_count(&self) -> u32 {
        self.index_count
    }

    fn index_type(&self) -> IndexType {
        self.index_type
    }

    fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }
}

// ===== MATERIAL =====

/// Material component: set-1 bindings plus readiness.
#[derive(Clone)]
pub struct MaterialComponent {
    pub binding_group: Arc<dyn BindingGroup>,
    /// Not-ready materials are skipped by the G-buffer pass
    pub ready: bool,
}

impl MaterialSource for MaterialComponent {
    fn binding_group(&self) -> &Arc<dyn BindingGroup> {
        &self.binding_group
    }
}

// ===== BOUNDING BOX =====

/// Local and world bounding boxes; world is refreshed from local and
/// the transform whenever the transform's dirty bit is set.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxComponent {
    pub local: BoundingBox,
    pub world: BoundingBox,
}

impl BoundingBoxComponent {
    pub fn new(local: BoundingBox) -> Self {
        Self {
            local,
            world: local,
        }
    }

    /// Recompute the world box from the local box and a world matrix.
    pub fn refresh(&mut self, matrix: &Mat4) {
        self.world = self.local.transformed(matrix);
    }
}

// ===== LIGHT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
    Spot,
}

/// Light component, consumed by both the G-buffer lighting and the
/// cascade tracer.
#[derive(Debug, Clone, Copy)]
pub struct LightComponent {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Spot lights only
    pub inner_cone_angle: f32,
    /// Spot lights only
    pub outer_cone_angle: f32,
    pub is_active: bool,
    pub casts_shadow: bool,
}

impl LightComponent {
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            range,
            inner_cone_angle: 0.0,
            outer_cone_angle: 0.0,
            is_active: true,
            casts_shadow: false,
        }
    }
}

// ===== BLAS =====

/// Per-entity BLAS plus its slot in the TLAS instance list.
#[derive(Clone)]
pub struct BlasComponent {
    pub blas: Arc<dyn Blas>,
    /// Whether the entity was registered with the scene TLAS
    pub registered: bool,
    /// Index into the TLAS instance list, assigned at TLAS build
    pub tlas_instance_index: Option<usize>,
}
