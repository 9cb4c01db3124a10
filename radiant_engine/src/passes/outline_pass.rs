/// OutlinePass — selection border composited over the swap image.
///
/// Renders only the selected entity's mesh, expanded along its
/// normals by `border_width` in NDC, with depth writes and stencil
/// test disabled. The fragment shader samples the G-buffer
/// depth-stencil through its bindless index and discards fragments
/// covered by the object's own interior, leaving a ring. Without a
/// selection the pass records nothing.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::bindless::BindlessIndex;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentTarget, BlendMode, ClearValue, CommandList, CullMode, DepthStencilState,
    GraphicsDevice, GraphicsPipeline, GraphicsPipelineDesc, LoadOp, PushConstantRange, Rect2D,
    RenderingAttachment, RenderingInfo, Shader, ShaderStageFlags, StoreOp, Texture, Viewport,
};
use crate::scene::{DrawItem, MeshSource, TransformSource};

/// Vertex and fragment shaders of the outline pass.
pub struct OutlineShaders {
    pub vertex: Arc<dyn Shader>,
    pub fragment: Arc<dyn Shader>,
}

/// Host-tunable outline appearance.
#[derive(Debug, Clone, Copy)]
pub struct OutlineSettings {
    /// Border width in NDC units
    pub border_width: f32,
    /// Border colour (RGBA)
    pub color: [f32; 4],
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            border_width: 0.01,
            color: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct OutlinePushConstants {
    model: [f32; 16],
    color: [f32; 4],
    border_width: f32,
    depth_stencil_index: u32,
    camera_ubo_index: u32,
    _pad: u32,
}

pub struct OutlinePass {
    pipeline: Arc<dyn GraphicsPipeline>,
    settings: OutlineSettings,
}

impl OutlinePass {
    pub fn new(device: &mut dyn GraphicsDevice, shaders: OutlineShaders) -> Result<Self> {
        let pipeline = device.create_graphics_pipeline(GraphicsPipelineDesc {
            name: "selection_outline".to_string(),
            vertex_shader: shaders.vertex,
            fragment_shader: shaders.fragment,
            color_formats: vec![device.swapchain_format()],
            blend_modes: vec![BlendMode::Alpha],
            // The depth-stencil is sampled, never attached here.
            depth_stencil_format: None,
            depth_stencil: DepthStencilState::default(),
            cull_mode: CullMode::None,
            push_constants: vec![PushConstantRange {
                stages: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
                size: std::mem::size_of::<OutlinePushConstants>() as u32,
            }],
        })?;

        Ok(Self {
            pipeline,
            settings: OutlineSettings::default(),
        })
    }

    pub fn settings(&self) -> OutlineSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: OutlineSettings) {
        self.settings = settings;
    }

    /// Record the outline over the swap image.
    ///
    /// `selected` is the selected entity's draw data; `depth_stencil`
    /// is the G-buffer attachment of the same frame, already in
    /// shader-read layout. Returns `false` when there is nothing to
    /// outline.
    pub fn record(
        &self,
        list: &mut dyn CommandList,
        extent: (u32, u32),
        selected: Option<&DrawItem>,
        depth_stencil: &dyn Texture,
        camera_ubo_index: BindlessIndex,
    ) -> Result<bool> {
        let Some(item) = selected else {
            return Ok(false);
        };

        list.begin_rendering(&RenderingInfo {
            extent,
            color_attachments: vec![RenderingAttachment {
                target: AttachmentTarget::Swapchain,
                // Composite over the lit frame.
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
                clear: ClearValue::Color([0.0, 0.0, 0.0, 1.0]),
            }],
            depth_stencil_attachment: None,
        })?;

        list.bind_graphics_pipeline(self.pipeline.as_ref())?;
        list.set_viewport(Viewport::from_extent(extent.0, extent.1))?;
        list.set_scissor(Rect2D::from_extent(extent.0, extent.1))?;

        list.set_vertex_layout(item.mesh.vertex_layout())?;
        list.bind_vertex_buffer(item.mesh.vertex_buffer().as_ref())?;
        list.bind_index_buffer(item.mesh.index_buffer().as_ref(), item.mesh.index_type())?;

        let push = OutlinePushConstants {
            model: item.transform.matrix().to_cols_array(),
            color: self.settings.color,
            border_width: self.settings.border_width,
            depth_stencil_index: depth_stencil.bindless_index().get(),
            camera_ubo_index: camera_ubo_index.get(),
            _pad: 0,
        };
        list.push_constants(
            ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
            bytemuck::bytes_of(&push),
        )?;

        list.draw_indexed(item.mesh.index_count(), 1, 0, 0, 0)?;
        list.end_rendering()?;

        Ok(true)
    }
}

#[cfg(test)]
#[path = "outline_pass_tests.rs"]
mod tests;
