/// Buffer trait and buffer descriptor

use crate::bindless::BindlessIndex;
use crate::error::Result;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer (also consumed by BLAS builds)
    Vertex,
    /// Index buffer (also consumed by BLAS builds)
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Storage buffer
    Storage,
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size of one index in bytes.
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Buffer data format for vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,          // float (4 bytes)
    R32G32_SFLOAT,       // vec2 (8 bytes)
    R32G32B32_SFLOAT,    // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)
    R32_UINT,
    R8G8B8A8_UNORM,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT | BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
            BufferFormat::R8G8B8A8_UNORM => 4,
        }
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name, shown by backend validation tooling
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Whether the buffer must be CPU-writable (per-frame UBO slices)
    pub cpu_visible: bool,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types. The buffer is
/// destroyed when the last reference drops.
pub trait Buffer: Send + Sync {
    /// The descriptor the buffer was created with.
    fn desc(&self) -> &BufferDesc;

    /// Update buffer data.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Stable slot in the bindless UBO array, or `BindlessIndex::NULL`
    /// if the buffer was never registered there.
    ///
    /// Cascade-level UBOs are registered so shaders read them by
    /// cascade index.
    fn bindless_index(&self) -> BindlessIndex;
}
