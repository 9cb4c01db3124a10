/// Pipeline traits and state descriptors
///
/// Graphics pipelines target dynamic rendering: attachment formats are
/// part of the pipeline description, not a render-pass object. Vertex
/// input, stencil reference, and stencil write mask are dynamic state
/// set on the command list per draw.

use std::sync::Arc;
use super::buffer::BufferFormat;
use super::shader::{Shader, ShaderStageFlags};
use super::texture::TextureFormat;

// ===== VERTEX LAYOUT =====

/// Rate at which vertex attributes advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// One vertex buffer binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// One vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: BufferFormat,
    pub offset: u32,
}

/// Complete vertex layout, set dynamically per draw from the mesh's
/// layout description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

// ===== DEPTH / STENCIL =====

/// Depth/stencil comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    Always,
}

/// Stencil operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
}

/// Per-face stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceState {
    pub fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub compare_op: CompareOp,
    pub compare_mask: u32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            compare_mask: 0xFF,
        }
    }
}

/// Depth-stencil pipeline state.
///
/// The stencil reference and write mask are dynamic and set per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub stencil_test: bool,
    pub front: StencilFaceState,
    pub back: StencilFaceState,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            depth_compare: CompareOp::Always,
            stencil_test: false,
            front: StencilFaceState::default(),
            back: StencilFaceState::default(),
        }
    }
}

// ===== RASTERIZATION / BLEND =====

/// Triangle culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
    Front,
}

/// Per-attachment blend state. Only the two modes the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite the destination
    Opaque,
    /// src_alpha * src + (1 - src_alpha) * dst
    Alpha,
}

// ===== PUSH CONSTANTS =====

/// One push-constant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub size: u32,
}

// ===== DESCRIPTORS =====

/// Descriptor for creating a graphics pipeline (dynamic rendering).
#[derive(Clone)]
pub struct GraphicsPipelineDesc {
    /// Debug name
    pub name: String,
    pub vertex_shader: Arc<dyn Shader>,
    pub fragment_shader: Arc<dyn Shader>,
    /// Formats of the color attachments, in output order
    pub color_formats: Vec<TextureFormat>,
    /// Per-attachment blend mode, parallel to `color_formats`
    pub blend_modes: Vec<BlendMode>,
    /// Depth-stencil attachment format, if any
    pub depth_stencil_format: Option<TextureFormat>,
    pub depth_stencil: DepthStencilState,
    pub cull_mode: CullMode,
    pub push_constants: Vec<PushConstantRange>,
}

/// Descriptor for creating a compute pipeline.
#[derive(Clone)]
pub struct ComputePipelineDesc {
    /// Debug name
    pub name: String,
    pub shader: Arc<dyn Shader>,
    pub push_constants: Vec<PushConstantRange>,
}

// ===== TRAITS =====

/// Graphics pipeline trait
pub trait GraphicsPipeline: Send + Sync {
    /// Debug name of the pipeline.
    fn name(&self) -> &str;
}

/// Compute pipeline trait
pub trait ComputePipeline: Send + Sync {
    /// Debug name of the pipeline.
    fn name(&self) -> &str;
}
