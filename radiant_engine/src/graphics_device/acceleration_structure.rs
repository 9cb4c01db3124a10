/// GPU acceleration structures — BLAS/TLAS traits.
///
/// A BLAS wraps one mesh's geometry and is immutable once built. The
/// TLAS references BLAS instances with per-instance transforms and is
/// rebuilt when instances are added or removed, refit when only
/// transforms change.

use std::sync::Arc;
use glam::Mat4;
use crate::bindless::BindlessIndex;
use crate::error::Result;
use crate::scene::EntityKey;
use super::buffer::{Buffer, IndexType};

/// Descriptor for building a BLAS from a mesh's buffers.
#[derive(Clone)]
pub struct BlasDesc {
    /// Debug name
    pub name: String,
    pub vertex_buffer: Arc<dyn Buffer>,
    pub vertex_count: u32,
    /// Stride between consecutive positions in bytes
    pub vertex_stride: u32,
    /// Byte offset of the position attribute inside a vertex
    pub position_offset: u32,
    pub index_buffer: Arc<dyn Buffer>,
    pub index_count: u32,
    pub index_type: IndexType,
}

/// Bottom-level acceleration structure trait
///
/// Built at creation; construction fails with a build error on
/// allocation failure or unsupported vertex formats, and the owning
/// entity then remains without a BLAS.
pub trait Blas: Send + Sync {
    /// Debug name.
    fn name(&self) -> &str;

    /// Number of triangles the structure was built over.
    fn triangle_count(&self) -> u32;
}

/// One instance inside a TLAS.
#[derive(Clone)]
pub struct TlasInstance {
    pub blas: Arc<dyn Blas>,
    pub transform: Mat4,
    pub entity: EntityKey,
}

/// Top-level acceleration structure trait
///
/// The tracer must only be dispatched when `is_built()` and
/// `instance_count() > 0`; otherwise the frame skips the GI passes.
pub trait Tlas: Send + Sync {
    /// Append an instance. `build` must run before the next trace.
    fn add_instance(&mut self, instance: TlasInstance);

    /// Transform-only patch of already registered instances.
    ///
    /// Applied as a refit when the backend supports it, otherwise as a
    /// minimal rebuild. Out-of-range indices are an error.
    fn update_instances(&mut self, updates: &[(usize, Mat4)]) -> Result<()>;

    /// Build (or rebuild) the top-level structure over the current
    /// instance list. Fails with a build error on empty input.
    fn build(&mut self) -> Result<()>;

    /// Whether the structure matches the current instance list.
    fn is_built(&self) -> bool;

    /// Number of registered instances.
    fn instance_count(&self) -> usize;

    /// Remove all instances; the structure becomes unbuilt.
    fn clear(&mut self);

    /// Stable index into the bindless acceleration-structure array.
    ///
    /// Stays valid across updates that do not destroy the TLAS.
    fn bindless_index(&self) -> BindlessIndex;
}
