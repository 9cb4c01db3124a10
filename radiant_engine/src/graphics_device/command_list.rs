/// CommandList trait — recording surface for all passes.
///
/// One command list records for one queue (compute or graphics) of one
/// frame in flight. Recording is single-threaded; the list is owned
/// exclusively by its frame and recycled behind the frame fence.

use bitflags::bitflags;
use super::binding_group::BindingGroup;
use super::buffer::{Buffer, IndexType};
use super::pipeline::{ComputePipeline, GraphicsPipeline, VertexLayout};
use super::shader::ShaderStageFlags;
use super::texture::Texture;
use crate::error::Result;

// ===== BARRIERS =====

/// Image layouts the engine transitions between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Contents undefined; cheapest source layout for full rewrites
    Undefined,
    /// Read/write access from compute (storage image)
    General,
    ColorAttachment,
    DepthStencilAttachment,
    /// Sampled in shaders
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    Present,
}

bitflags! {
    /// Memory access kinds for barrier scopes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u32 {
        const NONE                 = 0;
        const SHADER_READ          = 1 << 0;
        const SHADER_WRITE         = 1 << 1;
        const COLOR_WRITE          = 1 << 2;
        const DEPTH_STENCIL_WRITE  = 1 << 3;
        const TRANSFER_READ        = 1 << 4;
        const TRANSFER_WRITE       = 1 << 5;
    }
}

/// One image layout transition with its access scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: Access,
    pub dst_access: Access,
}

// ===== DYNAMIC RENDERING =====

/// Load behaviour of an attachment at pass begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Clear to the attachment's clear value
    Clear,
    /// Keep previous contents (outline pass over the swap image)
    Load,
    DontCare,
}

/// Store behaviour of an attachment at pass end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Clear value for an attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// What an attachment renders into.
pub enum AttachmentTarget<'a> {
    /// An engine-owned texture
    Texture(&'a dyn Texture),
    /// The swapchain image acquired for the current frame
    Swapchain,
}

/// One attachment of a dynamic rendering pass.
pub struct RenderingAttachment<'a> {
    pub target: AttachmentTarget<'a>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Dynamic rendering pass description.
pub struct RenderingInfo<'a> {
    /// Render area, full-extent from the origin
    pub extent: (u32, u32),
    pub color_attachments: Vec<RenderingAttachment<'a>>,
    pub depth_stencil_attachment: Option<RenderingAttachment<'a>>,
}

// ===== VIEWPORT =====

/// Viewport rectangle with depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with [0, 1] depth.
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Full-extent scissor from the origin.
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

// ===== TRAIT =====

/// Command recording trait
///
/// Implemented by backend-specific command lists. Misuse (recording
/// outside begin/end, drawing outside a rendering scope) is an error,
/// not undefined behaviour.
pub trait CommandList: Send + Sync {
    /// Start recording; resets previous contents.
    fn begin(&mut self) -> Result<()>;

    /// Finish recording.
    fn end(&mut self) -> Result<()>;

    // ----- barriers / transfer -----

    /// Record an image layout transition.
    fn image_barrier(&mut self, texture: &dyn Texture, transition: ImageTransition) -> Result<()>;

    /// Full-image copy. An array source flattens into a 2D
    /// destination as vertically stacked layers (cascade debug
    /// siblings); otherwise extents must match.
    fn copy_texture(&mut self, src: &dyn Texture, dst: &dyn Texture) -> Result<()>;

    // ----- compute -----

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipeline) -> Result<()>;

    /// Bind a binding group at its set index.
    fn bind_binding_group(&mut self, group: &dyn BindingGroup) -> Result<()>;

    /// Push a constant block visible to `stages`.
    fn push_constants(&mut self, stages: ShaderStageFlags, data: &[u8]) -> Result<()>;

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()>;

    // ----- graphics (dynamic rendering) -----

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()>;

    fn end_rendering(&mut self) -> Result<()>;

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn GraphicsPipeline) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Dynamic stencil reference (selection marking).
    fn set_stencil_reference(&mut self, reference: u32) -> Result<()>;

    /// Dynamic stencil write mask (0x00 disables stencil writes).
    fn set_stencil_write_mask(&mut self, mask: u32) -> Result<()>;

    /// Dynamic vertex input from the mesh's layout description.
    fn set_vertex_layout(&mut self, layout: &VertexLayout) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, index_type: IndexType) -> Result<()>;

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;
}
