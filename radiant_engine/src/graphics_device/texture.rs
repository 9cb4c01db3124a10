/// Texture trait and texture descriptor

use bitflags::bitflags;
use crate::bindless::BindlessIndex;

/// Texture pixel formats used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 32-bit float RGBA (radiance, position+depth)
    Rgba32Float,
    /// 16-bit float RGBA (normals)
    Rgba16Float,
    /// 8-bit sRGB RGBA (albedo + specular)
    Rgba8Srgb,
    /// 8-bit linear RGBA (material params, swapchain fallback)
    Rgba8Unorm,
    /// 8-bit BGRA (common swapchain format)
    Bgra8Unorm,
    /// 24-bit depth + 8-bit stencil
    Depth24Stencil8,
}

impl TextureFormat {
    /// Whether this is a depth-stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Plain 2D texture
    D2,
    /// 2D array texture (3D cascade volumes use one layer per Y slice)
    D2Array,
    /// Cubemap (skybox)
    Cube,
}

bitflags! {
    /// Intended usages of a texture; backends translate these into
    /// image usage flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        /// Sampled in shaders through the bindless array
        const SAMPLED          = 1 << 0;
        /// Written as a storage image by compute passes
        const STORAGE          = 1 << 1;
        /// Color attachment in a graphics pass
        const COLOR_ATTACHMENT = 1 << 2;
        /// Depth-stencil attachment in a graphics pass
        const DEPTH_STENCIL    = 1 << 3;
        /// Source of a GPU copy
        const TRANSFER_SRC     = 1 << 4;
        /// Destination of a GPU copy
        const TRANSFER_DST     = 1 << 5;
    }
}

/// Sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name, shown by backend validation tooling
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Array layer count for `D2Array`, otherwise 1
    pub depth: u32,
    pub format: TextureFormat,
    pub kind: TextureKind,
    pub usage: TextureUsage,
    pub filter: TextureFilter,
}

impl TextureDesc {
    /// A 2D sampled+storage texture, the common compute-pass shape.
    pub fn storage_2d(name: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            depth: 1,
            format,
            kind: TextureKind::D2,
            usage: TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::TRANSFER_SRC,
            filter: TextureFilter::Nearest,
        }
    }
}

/// Texture resource trait
///
/// Implemented by backend-specific texture types. The texture is
/// destroyed when the last reference drops; its bindless slots are
/// recycled only after the last frame that referenced it completes.
pub trait Texture: Send + Sync {
    /// The descriptor the texture was created with.
    fn desc(&self) -> &TextureDesc;

    /// Stable index into the bindless sampled-texture array, or
    /// `BindlessIndex::NULL` if the texture is not sampled.
    fn bindless_index(&self) -> BindlessIndex;

    /// Stable index into the bindless storage-image array, or
    /// `BindlessIndex::NULL` if the texture has no storage usage.
    fn storage_index(&self) -> BindlessIndex;
}
