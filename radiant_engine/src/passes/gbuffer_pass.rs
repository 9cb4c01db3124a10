/// GBufferPass — deferred geometry pass.
///
/// Rasterizes every renderable entity whose world AABB passes frustum
/// culling into four colour attachments plus depth-stencil:
///
/// | attachment  | format      | contents                           |
/// |-------------|-------------|------------------------------------|
/// | position    | RGBA32F     | world position + view depth        |
/// | normal      | RGBA16F     | world normal                       |
/// | albedo-spec | RGBA8 sRGB  | albedo rgb + specular              |
/// | material    | RGBA8       | metallic, roughness, AO, flag      |
/// | depth       | D24S8       | depth + selection stencil          |
///
/// The stencil marks selection: reference 1 with write mask 0xFF for
/// the selected entity, reference 0 with write mask 0x00 otherwise.
/// All attachments transition to shader-read at the end of the pass so
/// the outline pass and lighting can sample them.
///
/// Targets are per frame in flight and recreated on swapchain resize;
/// cascade resources are untouched by resizes.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::camera::{Camera, FrustumTest};
use crate::error::Result;
use crate::graphics_device::{
    Access, AttachmentTarget, BlendMode, ClearValue, CommandList, CompareOp, CullMode,
    DepthStencilState, GraphicsDevice, GraphicsPipeline, GraphicsPipelineDesc, ImageLayout,
    ImageTransition, LoadOp, PushConstantRange, Rect2D, RenderingAttachment, RenderingInfo,
    Shader, ShaderStageFlags, StencilFaceState, StencilOp, StoreOp, Texture, TextureDesc,
    TextureFilter, TextureFormat, TextureKind, TextureUsage, Viewport,
};
use crate::scene::{DrawItem, EntityKey, MaterialSource, MeshSource, TransformSource};

/// Per-draw constants: just the model matrix; everything else arrives
/// through the bindless set.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GBufferPushConstants {
    model: [f32; 16],
}

/// Vertex and fragment shaders of the geometry pass.
pub struct GBufferShaders {
    pub vertex: Arc<dyn Shader>,
    pub fragment: Arc<dyn Shader>,
}

/// One frame's attachment set.
struct FrameTargets {
    position: Arc<dyn Texture>,
    normal: Arc<dyn Texture>,
    albedo_spec: Arc<dyn Texture>,
    material: Arc<dyn Texture>,
    depth_stencil: Arc<dyn Texture>,
}

pub struct GBufferPass {
    pipeline: Arc<dyn GraphicsPipeline>,
    targets: Vec<FrameTargets>,
    extent: (u32, u32),
}

impl GBufferPass {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shaders: GBufferShaders,
    ) -> Result<Self> {
        // Selection stenciling: always pass, replace with the dynamic
        // reference, and write even on depth fail so occluded parts of
        // the selected mesh still mark the buffer.
        let stencil_face = StencilFaceState {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Replace,
            depth_fail_op: StencilOp::Replace,
            compare_op: CompareOp::Always,
            compare_mask: 0xFF,
        };

        let pipeline = device.create_graphics_pipeline(GraphicsPipelineDesc {
            name: "gbuffer".to_string(),
            vertex_shader: shaders.vertex,
            fragment_shader: shaders.fragment,
            // Order matters: it must match the fragment output locations.
            color_formats: vec![
                TextureFormat::Rgba32Float,
                TextureFormat::Rgba16Float,
                TextureFormat::Rgba8Srgb,
                TextureFormat::Rgba8Unorm,
            ],
            blend_modes: vec![BlendMode::Opaque; 4],
            depth_stencil_format: Some(TextureFormat::Depth24Stencil8),
            depth_stencil: DepthStencilState {
                depth_test: true,
                depth_write: true,
                depth_compare: CompareOp::Less,
                stencil_test: true,
                front: stencil_face,
                back: stencil_face,
            },
            cull_mode: CullMode::Back,
            push_constants: vec![PushConstantRange {
                stages: ShaderStageFlags::VERTEX,
                size: std::mem::size_of::<GBufferPushConstants>() as u32,
            }],
        })?;

        let extent = device.swapchain_extent();
        let frames_in_flight = device.frames_in_flight();
        let targets = Self::create_targets(device, extent, frames_in_flight)?;

        Ok(Self {
            pipeline,
            targets,
            extent,
        })
    }

    fn create_targets(
        device: &mut dyn GraphicsDevice,
        extent: (u32, u32),
        frames_in_flight: u32,
    ) -> Result<Vec<FrameTargets>> {
        let color = |name: String, format: TextureFormat| TextureDesc {
            name,
            width: extent.0,
            height: extent.1,
            depth: 1,
            format,
            kind: TextureKind::D2,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
            filter: TextureFilter::Nearest,
        };

        let mut targets = Vec::with_capacity(frames_in_flight as usize);
        for frame in 0..frames_in_flight {
            targets.push(FrameTargets {
                position: device.create_texture(color(
                    format!("[GBuffer] Position: {}", frame),
                    TextureFormat::Rgba32Float,
                ))?,
                normal: device.create_texture(color(
                    format!("[GBuffer] Normal: {}", frame),
                    TextureFormat::Rgba16Float,
                ))?,
                albedo_spec: device.create_texture(color(
                    format!("[GBuffer] AlbedoSpec: {}", frame),
                    TextureFormat::Rgba8Srgb,
                ))?,
                material: device.create_texture(color(
                    format!("[GBuffer] Material: {}", frame),
                    TextureFormat::Rgba8Unorm,
                ))?,
                depth_stencil: device.create_texture(TextureDesc {
                    name: format!("[GBuffer] DepthStencil: {}", frame),
                    width: extent.0,
                    height: extent.1,
                    depth: 1,
                    format: TextureFormat::Depth24Stencil8,
                    kind: TextureKind::D2,
                    usage: TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED,
                    filter: TextureFilter::Nearest,
                })?,
            });
        }
        Ok(targets)
    }

    /// Recreate every attachment at the new swapchain extent.
    pub fn resize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        self.extent = (width, height);
        let frames_in_flight = device.frames_in_flight();
        self.targets = Self::create_targets(device, self.extent, frames_in_flight)?;
        crate::engine_info!(
            "radiant::GBufferPass",
            "attachments recreated at {}x{}",
            width,
            height
        );
        Ok(())
    }

    /// Depth-stencil attachment of one frame, sampled by the outline
    /// pass after this pass transitions it to shader-read.
    pub fn depth_stencil_texture(&self, frame_index: u32) -> &Arc<dyn Texture> {
        &self.targets[frame_index as usize].depth_stencil
    }

    /// Position attachment of one frame (consumed by lighting).
    pub fn position_texture(&self, frame_index: u32) -> &Arc<dyn Texture> {
        &self.targets[frame_index as usize].position
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Record the pass. Returns the number of draws that survived
    /// frustum culling.
    pub fn record(
        &self,
        list: &mut dyn CommandList,
        frame_index: u32,
        camera: &Camera,
        draws: &[DrawItem],
        selected: Option<EntityKey>,
    ) -> Result<u32> {
        let targets = &self.targets[frame_index as usize];

        // Attachments are fully rewritten; previous contents are gone.
        for texture in [
            &targets.position,
            &targets.normal,
            &targets.albedo_spec,
            &targets.material,
        ] {
            list.image_barrier(
                texture.as_ref(),
                ImageTransition {
                    old_layout: ImageLayout::Undefined,
                    new_layout: ImageLayout::ColorAttachment,
                    src_access: Access::NONE,
                    dst_access: Access::COLOR_WRITE,
                },
            )?;
        }
        list.image_barrier(
            targets.depth_stencil.as_ref(),
            ImageTransition {
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::DepthStencilAttachment,
                src_access: Access::NONE,
                dst_access: Access::DEPTH_STENCIL_WRITE,
            },
        )?;

        fn color_attachment(texture: &Arc<dyn Texture>) -> RenderingAttachment<'_> {
            RenderingAttachment {
                target: AttachmentTarget::Texture(texture.as_ref()),
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear: ClearValue::Color([0.0, 0.0, 0.0, 0.0]),
            }
        }

        list.begin_rendering(&RenderingInfo {
            extent: self.extent,
            color_attachments: vec![
                color_attachment(&targets.position),
                color_attachment(&targets.normal),
                color_attachment(&targets.albedo_spec),
                color_attachment(&targets.material),
            ],
            depth_stencil_attachment: Some(RenderingAttachment {
                target: AttachmentTarget::Texture(targets.depth_stencil.as_ref()),
                load_op: LoadOp::Clear,
                // Stored so downstream passes can sample depth+stencil.
                store_op: StoreOp::Store,
                clear: ClearValue::DepthStencil {
                    depth: 1.0,
                    stencil: 0,
                },
            }),
        })?;

        list.bind_graphics_pipeline(self.pipeline.as_ref())?;
        list.set_viewport(Viewport::from_extent(self.extent.0, self.extent.1))?;
        list.set_scissor(Rect2D::from_extent(self.extent.0, self.extent.1))?;

        let frustum = camera.frustum();
        let mut drawn = 0u32;

        for item in draws {
            if frustum.classify_aabb(&item.world_aabb) == FrustumTest::Outside {
                continue;
            }

            if selected == Some(item.entity) {
                list.set_stencil_reference(1)?;
                list.set_stencil_write_mask(0xFF)?;
            } else {
                list.set_stencil_reference(0)?;
                list.set_stencil_write_mask(0x00)?;
            }

            list.set_vertex_layout(item.mesh.vertex_layout())?;
            list.bind_vertex_buffer(item.mesh.vertex_buffer().as_ref())?;
            list.bind_index_buffer(item.mesh.index_buffer().as_ref(), item.mesh.index_type())?;
            list.bind_binding_group(item.material.binding_group().as_ref())?;

            let push = GBufferPushConstants {
                model: item.transform.matrix().to_cols_array(),
            };
            list.push_constants(ShaderStageFlags::VERTEX, bytemuck::bytes_of(&push))?;

            list.draw_indexed(item.mesh.index_count(), 1, 0, 0, 0)?;
            drawn += 1;
        }

        list.end_rendering()?;

        // Hand everything to samplers: lighting reads the colour
        // attachments, the outline pass reads depth-stencil.
        for texture in [
            &targets.position,
            &targets.normal,
            &targets.albedo_spec,
            &targets.material,
        ] {
            list.image_barrier(
                texture.as_ref(),
                ImageTransition {
                    old_layout: ImageLayout::ColorAttachment,
                    new_layout: ImageLayout::ShaderReadOnly,
                    src_access: Access::COLOR_WRITE,
                    dst_access: Access::SHADER_READ,
                },
            )?;
        }
        list.image_barrier(
            targets.depth_stencil.as_ref(),
            ImageTransition {
                old_layout: ImageLayout::DepthStencilAttachment,
                new_layout: ImageLayout::ShaderReadOnly,
                src_access: Access::DEPTH_STENCIL_WRITE,
                dst_access: Access::SHADER_READ,
            },
        )?;

        Ok(drawn)
    }
}

#[cfg(test)]
#[path = "gbuffer_pass_tests.rs"]
mod tests;
