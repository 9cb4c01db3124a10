/// Pipelines - Vulkan graphics and compute pipeline implementations.
///
/// Graphics pipelines target dynamic rendering; vertex input, stencil
/// reference, and stencil write mask are dynamic state. Every pipeline
/// layout spans the same five sets: 0 = global bindless, 1 = material,
/// 2/3 = reserved (empty), 4 = per-pass transient.

use std::sync::Arc;
use ash::vk;
use radiant_engine::error::Result;
use radiant_engine::engine_err;
use radiant_engine::graphics_device::{
    BlendMode, CompareOp, ComputePipeline as CoreComputePipeline, ComputePipelineDesc, CullMode,
    GraphicsPipeline as CoreGraphicsPipeline, GraphicsPipelineDesc, PushConstantRange,
    Shader as CoreShader, ShaderStageFlags, StencilFaceState, StencilOp,
};
use crate::vulkan_shader::Shader;
use crate::vulkan_texture::vk_format;

/// Fixed set indices of the engine's descriptor model.
pub const SET_BINDLESS: u32 = 0;
pub const SET_MATERIAL: u32 = 1;
pub const SET_TRANSIENT: u32 = 4;

/// The shared non-bindless set layouts, created once per device.
pub struct SetLayouts {
    pub material: vk::DescriptorSetLayout,
    pub empty: vk::DescriptorSetLayout,
    pub transient: vk::DescriptorSetLayout,
}

impl SetLayouts {
    pub fn new(device: &ash::Device) -> Result<Self> {
        unsafe {
            // Material set: albedo/normal/metallic-roughness/occlusion
            // textures plus the parameter UBO.
            let material_bindings = [
                vk::DescriptorSetLayoutBinding::default()
                    .binding(0)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(4)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(1)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            ];
            let material = device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default().bindings(&material_bindings),
                    None,
                )
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create material layout: {:?}", e)
                })?;

            let empty = device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default(),
                    None,
                )
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create empty layout: {:?}", e)
                })?;

            // Transient set: one storage image (cascade radiance /
            // irradiance target of the running pass).
            let transient_bindings = [vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::COMPUTE)];
            let transient = device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default().bindings(&transient_bindings),
                    None,
                )
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create transient layout: {:?}", e)
                })?;

            Ok(Self {
                material,
                empty,
                transient,
            })
        }
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_descriptor_set_layout(self.material, None);
            device.destroy_descriptor_set_layout(self.empty, None);
            device.destroy_descriptor_set_layout(self.transient, None);
        }
    }
}

// ===== TRANSLATION =====

fn vk_stages(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
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

fn vk_compare(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

fn vk_stencil_op(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::Zero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::Invert => vk::StencilOp::INVERT,
    }
}

fn vk_stencil_face(face: &StencilFaceState) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: vk_stencil_op(face.fail_op),
        pass_op: vk_stencil_op(face.pass_op),
        depth_fail_op: vk_stencil_op(face.depth_fail_op),
        compare_op: vk_compare(face.compare_op),
        compare_mask: face.compare_mask,
        // Dynamic state; these are placeholders.
        write_mask: 0xFF,
        reference: 0,
    }
}

fn push_constant_ranges(ranges: &[PushConstantRange]) -> Vec<vk::PushConstantRange> {
    ranges
        .iter()
        .map(|range| vk::PushConstantRange {
            stage_flags: vk_stages(range.stages),
            offset: 0,
            size: range.size,
        })
        .collect()
}

/// Downcast a core shader handle to the Vulkan shader.
///
/// Sound for this backend: every shader the device hands out is a
/// `crate::vulkan_shader::Shader`.
pub(crate) unsafe fn as_vulkan_shader(shader: &dyn CoreShader) -> &Shader {
    &*(shader as *const dyn CoreShader as *const Shader)
}

fn create_pipeline_layout(
    device: &ash::Device,
    bindless_layout: vk::DescriptorSetLayout,
    set_layouts: &SetLayouts,
    ranges: &[PushConstantRange],
) -> Result<vk::PipelineLayout> {
    let layouts = [
        bindless_layout,
        set_layouts.material,
        set_layouts.empty,
        set_layouts.empty,
        set_layouts.transient,
    ];
    let ranges = push_constant_ranges(ranges);

    let mut create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layouts);
    if !ranges.is_empty() {
        create_info = create_info.push_constant_ranges(&ranges);
    }

    unsafe {
        device.create_pipeline_layout(&create_info, None).map_err(|e| {
            engine_err!("radiant::vulkan", "Failed to create pipeline layout: {:?}", e)
        })
    }
}

// ===== GRAPHICS =====

pub struct GraphicsPipeline {
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) device: Arc<ash::Device>,
    name: String,
}

impl GraphicsPipeline {
    pub fn new(
        device: Arc<ash::Device>,
        bindless_layout: vk::DescriptorSetLayout,
        set_layouts: &SetLayouts,
        desc: GraphicsPipelineDesc,
    ) -> Result<Self> {
        let layout =
            create_pipeline_layout(&device, bindless_layout, set_layouts, &desc.push_constants)?;

        unsafe {
            let vertex_shader = as_vulkan_shader(desc.vertex_shader.as_ref());
            let fragment_shader = as_vulkan_shader(desc.fragment_shader.as_ref());

            let stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::VERTEX)
                    .module(vertex_shader.raw())
                    .name(c"main"),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fragment_shader.raw())
                    .name(c"main"),
            ];

            // Vertex input is fully dynamic (set per draw from the
            // mesh's layout description).
            let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

            let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewport_count(1)
                .scissor_count(1);

            let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
                .polygon_mode(vk::PolygonMode::FILL)
                .cull_mode(match desc.cull_mode {
                    CullMode::None => vk::CullModeFlags::NONE,
                    CullMode::Back => vk::CullModeFlags::BACK,
                    CullMode::Front => vk::CullModeFlags::FRONT,
                })
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .line_width(1.0);

            let multisample = vk::PipelineMultisampleStateCreateInfo::default()
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
                .blend_modes
                .iter()
                .map(|mode| match mode {
                    BlendMode::Opaque => vk::PipelineColorBlendAttachmentState::default()
                        .color_write_mask(vk::ColorComponentFlags::RGBA),
                    BlendMode::Alpha => vk::PipelineColorBlendAttachmentState::default()
                        .color_write_mask(vk::ColorComponentFlags::RGBA)
                        .blend_enable(true)
                        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                        .color_blend_op(vk::BlendOp::ADD)
                        .src_alpha_blend_factor(vk::BlendFactor::ONE)
                        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                        .alpha_blend_op(vk::BlendOp::ADD),
                })
                .collect();
            let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
                .attachments(&blend_attachments);

            let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(desc.depth_stencil.depth_test)
                .depth_write_enable(desc.depth_stencil.depth_write)
                .depth_compare_op(vk_compare(desc.depth_stencil.depth_compare))
                .stencil_test_enable(desc.depth_stencil.stencil_test)
                .front(vk_stencil_face(&desc.depth_stencil.front))
                .back(vk_stencil_face(&desc.depth_stencil.back));

            let dynamic_states = [
                vk::DynamicState::VIEWPORT,
                vk::DynamicState::SCISSOR,
                vk::DynamicState::STENCIL_REFERENCE,
                vk::DynamicState::STENCIL_WRITE_MASK,
                vk::DynamicState::VERTEX_INPUT_EXT,
            ];
            let dynamic_state =
                vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

            let color_formats: Vec<vk::Format> =
                desc.color_formats.iter().map(|f| vk_format(*f)).collect();
            let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
                .color_attachment_formats(&color_formats);
            if let Some(depth_format) = desc.depth_stencil_format {
                rendering_info = rendering_info
                    .depth_attachment_format(vk_format(depth_format))
                    .stencil_attachment_format(vk_format(depth_format));
            }

            let create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&stages)
                .vertex_input_state(&vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .color_blend_state(&color_blend)
                .depth_stencil_state(&depth_stencil)
                .dynamic_state(&dynamic_state)
                .layout(layout)
                .push_next(&mut rendering_info);

            let pipeline = device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| {
                    engine_err!(
                        "radiant::vulkan",
                        "Failed to create graphics pipeline '{}': {:?}",
                        desc.name,
                        e
                    )
                })?[0];

            Ok(Self {
                pipeline,
                layout,
                device,
                name: desc.name,
            })
        }
    }
}

impl CoreGraphicsPipeline for GraphicsPipeline {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

// ===== COMPUTE =====

pub struct ComputePipeline {
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) device: Arc<ash::Device>,
    name: String,
}

impl ComputePipeline {
    pub fn new(
        device: Arc<ash::Device>,
        bindless_layout: vk::DescriptorSetLayout,
        set_layouts: &SetLayouts,
        desc: ComputePipelineDesc,
    ) -> Result<Self> {
        let layout =
            create_pipeline_layout(&device, bindless_layout, set_layouts, &desc.push_constants)?;

        unsafe {
            let shader = as_vulkan_shader(desc.shader.as_ref());

            // Cross-check the declared push range against reflection.
            let declared: u32 = desc.push_constants.iter().map(|r| r.size).max().unwrap_or(0);
            if shader.push_constant_size > declared {
                radiant_engine::engine_warn!(
                    "radiant::vulkan",
                    "pipeline '{}': shader push block ({} bytes) exceeds declared range ({})",
                    desc.name,
                    shader.push_constant_size,
                    declared
                );
            }

            let stage = vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::COMPUTE)
                .module(shader.raw())
                .name(c"main");

            let create_info = vk::ComputePipelineCreateInfo::default()
                .stage(stage)
                .layout(layout);

            let pipeline = device
                .create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| {
                    engine_err!(
                        "radiant::vulkan",
                        "Failed to create compute pipeline '{}': {:?}",
                        desc.name,
                        e
                    )
                })?[0];

            Ok(Self {
                pipeline,
                layout,
                device,
                name: desc.name,
            })
        }
    }
}

impl CoreComputePipeline for ComputePipeline {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
