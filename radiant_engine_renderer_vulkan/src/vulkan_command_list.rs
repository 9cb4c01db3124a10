/// CommandList - Vulkan implementation of the core CommandList trait.
///
/// One primary command buffer per list. Binding a pipeline also binds
/// the global bindless set (set 0) at the matching bind point; the
/// bound layout is remembered for descriptor and push-constant calls.
/// Recording-state misuse is reported as an error, mirroring the
/// core's contract.

use std::sync::Arc;
use ash::vk;
use radiant_engine::error::Result;
use radiant_engine::{engine_bail, engine_err};
use radiant_engine::graphics_device::{
    Access, AttachmentTarget, BindingGroup as CoreBindingGroup, Buffer as CoreBuffer,
    BufferFormat, ClearValue, CommandList as CoreCommandList, ComputePipeline as CoreCompute,
    GraphicsPipeline as CoreGraphics, ImageLayout, ImageTransition, IndexType, LoadOp,
    Rect2D, RenderingInfo, ShaderStageFlags, StoreOp, Texture as CoreTexture, VertexInputRate,
    VertexLayout, Viewport,
};
use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_pipeline::{ComputePipeline, GraphicsPipeline};
use crate::vulkan_texture::{vk_aspect, Texture};

/// The swapchain image the current frame renders into, installed by
/// the device at acquire time.
#[derive(Clone, Copy)]
pub struct SwapchainTarget {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
}

unsafe fn as_vulkan_texture(texture: &dyn CoreTexture) -> &Texture {
    &*(texture as *const dyn CoreTexture as *const Texture)
}

unsafe fn as_vulkan_buffer(buffer: &dyn CoreBuffer) -> &Buffer {
    &*(buffer as *const dyn CoreBuffer as *const Buffer)
}

fn vk_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        }
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::Present => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

fn vk_access(access: Access) -> vk::AccessFlags {
    let mut result = vk::AccessFlags::empty();
    if access.contains(Access::SHADER_READ) {
        result |= vk::AccessFlags::SHADER_READ;
    }
    if access.contains(Access::SHADER_WRITE) {
        result |= vk::AccessFlags::SHADER_WRITE;
    }
    if access.contains(Access::COLOR_WRITE) {
        result |= vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    }
    if access.contains(Access::DEPTH_STENCIL_WRITE) {
        result |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    if access.contains(Access::TRANSFER_READ) {
        result |= vk::AccessFlags::TRANSFER_READ;
    }
    if access.contains(Access::TRANSFER_WRITE) {
        result |= vk::AccessFlags::TRANSFER_WRITE;
    }
    result
}

/// Pipeline stages participating in a barrier, derived from its access
/// scope. `is_destination` picks the conservative end for empty masks.
fn vk_stage(access: Access, is_destination: bool) -> vk::PipelineStageFlags {
    if access == Access::NONE {
        return if is_destination {
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        } else {
            vk::PipelineStageFlags::TOP_OF_PIPE
        };
    }

    let mut result = vk::PipelineStageFlags::empty();
    if access.intersects(Access::SHADER_READ | Access::SHADER_WRITE) {
        result |= vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
    }
    if access.contains(Access::COLOR_WRITE) {
        result |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    }
    if access.contains(Access::DEPTH_STENCIL_WRITE) {
        result |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    }
    if access.intersects(Access::TRANSFER_READ | Access::TRANSFER_WRITE) {
        result |= vk::PipelineStageFlags::TRANSFER;
    }
    result
}

fn vk_vertex_format(format: BufferFormat) -> vk::Format {
    match format {
        BufferFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        BufferFormat::R32_UINT => vk::Format::R32_UINT,
        BufferFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
    }
}

fn vk_shader_stages(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut result = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStageFlags::VERTEX) {
        result |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        result |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stages.contains(ShaderStageFlags::COMPUTE) {
        result |= vk::ShaderStageFlags::COMPUTE;
    }
    result
}

pub struct CommandList {
    device: Arc<ash::Device>,
    vertex_input_loader: ash::ext::vertex_input_dynamic_state::Device,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    bindless_set: vk::DescriptorSet,
    is_recording: bool,
    in_rendering: bool,
    bound_layout: Option<(vk::PipelineLayout, vk::PipelineBindPoint)>,
    swapchain_target: Option<SwapchainTarget>,
    /// The list rendered into the swapchain image this frame
    pub(crate) used_swapchain: bool,
}

impl CommandList {
    pub fn new(
        device: Arc<ash::Device>,
        vertex_input_loader: ash::ext::vertex_input_dynamic_state::Device,
        queue_family: u32,
        bindless_set: vk::DescriptorSet,
    ) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_err!("radiant::vulkan", "Failed to create command pool: {:?}", e)
            })?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to allocate command buffer: {:?}", e)
                })?[0];

            Ok(Self {
                device,
                vertex_input_loader,
                command_pool,
                command_buffer,
                bindless_set,
                is_recording: false,
                in_rendering: false,
                bound_layout: None,
                swapchain_target: None,
                used_swapchain: false,
            })
        }
    }

    pub fn raw(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Install this frame's swapchain image (device-internal).
    pub(crate) fn set_swapchain_target(&mut self, target: SwapchainTarget) {
        self.swapchain_target = Some(target);
        self.used_swapchain = false;
    }

    fn require_recording(&self, what: &str) -> Result<()> {
        if !self.is_recording {
            engine_bail!("radiant::vulkan", "{}: command list not recording", what);
        }
        Ok(())
    }

    fn bind_bindless(&self, layout: vk::PipelineLayout, bind_point: vk::PipelineBindPoint) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                bind_point,
                layout,
                0,
                &[self.bindless_set],
                &[],
            );
        }
    }
}

impl CoreCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            engine_bail!("radiant::vulkan", "begin: command list already recording");
        }
        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to reset command buffer: {:?}", e)
                })?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to begin command buffer: {:?}", e)
                })?;
        }
        self.is_recording = true;
        self.in_rendering = false;
        self.bound_layout = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        if self.in_rendering {
            engine_bail!("radiant::vulkan", "end: rendering scope still open");
        }
        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to end command buffer: {:?}", e)
                })?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn image_barrier(&mut self, texture: &dyn CoreTexture, transition: ImageTransition) -> Result<()> {
        self.require_recording("image_barrier")?;
        unsafe {
            let vulkan_texture = as_vulkan_texture(texture);
            let barrier = vk::ImageMemoryBarrier::default()
                .old_layout(vk_layout(transition.old_layout))
                .new_layout(vk_layout(transition.new_layout))
                .src_access_mask(vk_access(transition.src_access))
                .dst_access_mask(vk_access(transition.dst_access))
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(vulkan_texture.raw_image())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk_aspect(texture.desc().format))
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(vulkan_texture.layer_count()),
                );

            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                vk_stage(transition.src_access, false),
                vk_stage(transition.dst_access, true),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        Ok(())
    }

    fn copy_texture(&mut self, src: &dyn CoreTexture, dst: &dyn CoreTexture) -> Result<()> {
        self.require_recording("copy_texture")?;
        unsafe {
            let src_texture = as_vulkan_texture(src);
            let dst_texture = as_vulkan_texture(dst);
            let src_desc = src.desc();

            // Array sources flatten into a 2D destination as
            // vertically stacked layers.
            let mut regions = Vec::new();
            for layer in 0..src_texture.layer_count() {
                regions.push(
                    vk::ImageCopy::default()
                        .src_subresource(
                            vk::ImageSubresourceLayers::default()
                                .aspect_mask(vk_aspect(src_desc.format))
                                .base_array_layer(layer)
                                .layer_count(1),
                        )
                        .dst_subresource(
                            vk::ImageSubresourceLayers::default()
                                .aspect_mask(vk_aspect(dst.desc().format))
                                .layer_count(1),
                        )
                        .dst_offset(vk::Offset3D {
                            x: 0,
                            y: (layer * src_desc.height) as i32,
                            z: 0,
                        })
                        .extent(vk::Extent3D {
                            width: src_desc.width,
                            height: src_desc.height,
                            depth: 1,
                        }),
                );
            }

            self.device.cmd_copy_image(
                self.command_buffer,
                src_texture.raw_image(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_texture.raw_image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &regions,
            );
        }
        Ok(())
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn CoreCompute) -> Result<()> {
        self.require_recording("bind_compute_pipeline")?;
        unsafe {
            let vulkan_pipeline =
                &*(pipeline as *const dyn CoreCompute as *const ComputePipeline);
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                vulkan_pipeline.pipeline,
            );
            self.bind_bindless(vulkan_pipeline.layout, vk::PipelineBindPoint::COMPUTE);
            self.bound_layout = Some((vulkan_pipeline.layout, vk::PipelineBindPoint::COMPUTE));
        }
        Ok(())
    }

    fn bind_binding_group(&mut self, group: &dyn CoreBindingGroup) -> Result<()> {
        self.require_recording("bind_binding_group")?;
        let Some((layout, bind_point)) = self.bound_layout else {
            engine_bail!("radiant::vulkan", "bind_binding_group: no pipeline bound");
        };
        unsafe {
            let vulkan_group = &*(group as *const dyn CoreBindingGroup as *const BindingGroup);
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                bind_point,
                layout,
                group.set_index(),
                &[vulkan_group.set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, data: &[u8]) -> Result<()> {
        self.require_recording("push_constants")?;
        let Some((layout, _)) = self.bound_layout else {
            engine_bail!("radiant::vulkan", "push_constants: no pipeline bound");
        };
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                layout,
                vk_shader_stages(stages),
                0,
                data,
            );
        }
        Ok(())
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()> {
        self.require_recording("dispatch")?;
        unsafe {
            self.device
                .cmd_dispatch(self.command_buffer, groups_x, groups_y, groups_z);
        }
        Ok(())
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        self.require_recording("begin_rendering")?;
        if self.in_rendering {
            engine_bail!("radiant::vulkan", "begin_rendering: scope already open");
        }

        unsafe {
            let mut color_infos = Vec::with_capacity(info.color_attachments.len());
            for attachment in &info.color_attachments {
                let view = match &attachment.target {
                    AttachmentTarget::Texture(texture) => as_vulkan_texture(*texture).raw_view(),
                    AttachmentTarget::Swapchain => {
                        let Some(target) = self.swapchain_target else {
                            engine_bail!(
                                "radiant::vulkan",
                                "begin_rendering: no swapchain image installed"
                            );
                        };
                        // First swapchain use of the frame: the image
                        // arrives in UNDEFINED from the acquire.
                        if !self.used_swapchain {
                            let barrier = vk::ImageMemoryBarrier::default()
                                .old_layout(vk::ImageLayout::UNDEFINED)
                                .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                                .src_access_mask(vk::AccessFlags::empty())
                                .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                                .image(target.image)
                                .subresource_range(
                                    vk::ImageSubresourceRange::default()
                                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                                        .level_count(1)
                                        .layer_count(1),
                                );
                            self.device.cmd_pipeline_barrier(
                                self.command_buffer,
                                vk::PipelineStageFlags::TOP_OF_PIPE,
                                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                                vk::DependencyFlags::empty(),
                                &[],
                                &[],
                                &[barrier],
                            );
                            self.used_swapchain = true;
                        }
                        target.view
                    }
                };

                let clear = match attachment.clear {
                    ClearValue::Color(rgba) => vk::ClearValue {
                        color: vk::ClearColorValue { float32: rgba },
                    },
                    ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
                    },
                };

                color_infos.push(
                    vk::RenderingAttachmentInfo::default()
                        .image_view(view)
                        .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                        .load_op(match attachment.load_op {
                            LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
                            LoadOp::Load => vk::AttachmentLoadOp::LOAD,
                            LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
                        })
                        .store_op(match attachment.store_op {
                            StoreOp::Store => vk::AttachmentStoreOp::STORE,
                            StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
                        })
                        .clear_value(clear),
                );
            }

            let depth_info = info.depth_stencil_attachment.as_ref().map(|attachment| {
                let view = match &attachment.target {
                    AttachmentTarget::Texture(texture) => as_vulkan_texture(*texture).raw_view(),
                    AttachmentTarget::Swapchain => vk::ImageView::null(),
                };
                let clear = match attachment.clear {
                    ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
                    },
                    ClearValue::Color(_) => vk::ClearValue::default(),
                };
                vk::RenderingAttachmentInfo::default()
                    .image_view(view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op(match attachment.load_op {
                        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
                        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
                        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
                    })
                    .store_op(match attachment.store_op {
                        StoreOp::Store => vk::AttachmentStoreOp::STORE,
                        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
                    })
                    .clear_value(clear)
            });

            let mut rendering_info = vk::RenderingInfo::default()
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: vk::Extent2D {
                        width: info.extent.0,
                        height: info.extent.1,
                    },
                })
                .layer_count(1)
                .color_attachments(&color_infos);
            if let Some(depth_info) = depth_info.as_ref() {
                rendering_info = rendering_info
                    .depth_attachment(depth_info)
                    .stencil_attachment(depth_info);
            }

            self.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_rendering = true;
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.require_recording("end_rendering")?;
        if !self.in_rendering {
            engine_bail!("radiant::vulkan", "end_rendering: no scope open");
        }
        unsafe {
            self.device.cmd_end_rendering(self.command_buffer);
        }
        self.in_rendering = false;
        Ok(())
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn CoreGraphics) -> Result<()> {
        self.require_recording("bind_graphics_pipeline")?;
        unsafe {
            let vulkan_pipeline =
                &*(pipeline as *const dyn CoreGraphics as *const GraphicsPipeline);
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vulkan_pipeline.pipeline,
            );
            self.bind_bindless(vulkan_pipeline.layout, vk::PipelineBindPoint::GRAPHICS);
            self.bound_layout = Some((vulkan_pipeline.layout, vk::PipelineBindPoint::GRAPHICS));
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;
        unsafe {
            self.device.cmd_set_viewport(
                self.command_buffer,
                0,
                &[vk::Viewport {
                    x: viewport.x,
                    y: viewport.y,
                    width: viewport.width,
                    height: viewport.height,
                    min_depth: viewport.min_depth,
                    max_depth: viewport.max_depth,
                }],
            );
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording("set_scissor")?;
        unsafe {
            self.device.cmd_set_scissor(
                self.command_buffer,
                0,
                &[vk::Rect2D {
                    offset: vk::Offset2D {
                        x: scissor.x,
                        y: scissor.y,
                    },
                    extent: vk::Extent2D {
                        width: scissor.width,
                        height: scissor.height,
                    },
                }],
            );
        }
        Ok(())
    }

    fn set_stencil_reference(&mut self, reference: u32) -> Result<()> {
        self.require_recording("set_stencil_reference")?;
        unsafe {
            self.device.cmd_set_stencil_reference(
                self.command_buffer,
                vk::StencilFaceFlags::FRONT_AND_BACK,
                reference,
            );
        }
        Ok(())
    }

    fn set_stencil_write_mask(&mut self, mask: u32) -> Result<()> {
        self.require_recording("set_stencil_write_mask")?;
        unsafe {
            self.device.cmd_set_stencil_write_mask(
                self.command_buffer,
                vk::StencilFaceFlags::FRONT_AND_BACK,
                mask,
            );
        }
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: &VertexLayout) -> Result<()> {
        self.require_recording("set_vertex_layout")?;
        unsafe {
            let bindings: Vec<vk::VertexInputBindingDescription2EXT> = layout
                .bindings
                .iter()
                .map(|binding| {
                    vk::VertexInputBindingDescription2EXT::default()
                        .binding(binding.binding)
                        .stride(binding.stride)
                        .input_rate(match binding.input_rate {
                            VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
                            VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
                        })
                        .divisor(1)
                })
                .collect();

            let attributes: Vec<vk::VertexInputAttributeDescription2EXT> = layout
                .attributes
                .iter()
                .map(|attribute| {
                    vk::VertexInputAttributeDescription2EXT::default()
                        .location(attribute.location)
                        .binding(attribute.binding)
                        .format(vk_vertex_format(attribute.format))
                        .offset(attribute.offset)
                })
                .collect();

            self.vertex_input_loader
                .cmd_set_vertex_input(self.command_buffer, &bindings, &attributes);
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn CoreBuffer) -> Result<()> {
        self.require_recording("bind_vertex_buffer")?;
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[as_vulkan_buffer(buffer).raw()],
                &[0],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn CoreBuffer, index_type: IndexType) -> Result<()> {
        self.require_recording("bind_index_buffer")?;
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                as_vulkan_buffer(buffer).raw(),
                0,
                match index_type {
                    IndexType::U16 => vk::IndexType::UINT16,
                    IndexType::U32 => vk::IndexType::UINT32,
                },
            );
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.require_recording("draw_indexed")?;
        if !self.in_rendering {
            engine_bail!("radiant::vulkan", "draw_indexed: outside a rendering scope");
        }
        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
