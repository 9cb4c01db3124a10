/// BindlessTable - the process-wide descriptor set (set 0).
///
/// Four update-after-bind arrays, indexed by the stable `u32` handles
/// the core allocates through `BindlessRegistry`:
///
/// | binding | array                    | capacity |
/// |---------|--------------------------|----------|
/// | 0       | combined image samplers  | 16384    |
/// | 1       | storage images           | 1024     |
/// | 2       | acceleration structures  | 16       |
/// | 3       | uniform buffers          | 256      |
///
/// All bindings are partially bound; shaders only read slots the
/// engine has written, and freed slots are quarantined by the
/// registry until every referencing frame retired.

use std::sync::{Arc, Mutex};
use ash::vk;
use radiant_engine::bindless::{BindlessIndex, BindlessRegistry};
use radiant_engine::error::Result;
use radiant_engine::engine_err;

pub const BINDING_SAMPLED: u32 = 0;
pub const BINDING_STORAGE: u32 = 1;
pub const BINDING_ACCEL: u32 = 2;
pub const BINDING_UNIFORM: u32 = 3;

const CAPACITY_SAMPLED: u32 = 16384;
const CAPACITY_STORAGE: u32 = 1024;
const CAPACITY_ACCEL: u32 = 16;
const CAPACITY_UNIFORM: u32 = 256;

pub struct BindlessTable {
    device: Arc<ash::Device>,
    pub registry: Mutex<BindlessRegistry>,
    layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    set: vk::DescriptorSet,
    default_sampler: vk::Sampler,
}

impl BindlessTable {
    pub fn new(device: Arc<ash::Device>, frames_in_flight: u32) -> Result<Self> {
        unsafe {
            let stages = vk::ShaderStageFlags::VERTEX
                | vk::ShaderStageFlags::FRAGMENT
                | vk::ShaderStageFlags::COMPUTE;

            let bindings = [
                vk::DescriptorSetLayoutBinding::default()
                    .binding(BINDING_SAMPLED)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(CAPACITY_SAMPLED)
                    .stage_flags(stages),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(BINDING_STORAGE)
                    .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                    .descriptor_count(CAPACITY_STORAGE)
                    .stage_flags(stages),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(BINDING_ACCEL)
                    .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
                    .descriptor_count(CAPACITY_ACCEL)
                    .stage_flags(stages),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(BINDING_UNIFORM)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(CAPACITY_UNIFORM)
                    .stage_flags(stages),
            ];

            let binding_flags = [vk::DescriptorBindingFlags::PARTIALLY_BOUND
                | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND; 4];
            let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default()
                .binding_flags(&binding_flags);

            let layout_info = vk::DescriptorSetLayoutCreateInfo::default()
                .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
                .bindings(&bindings)
                .push_next(&mut flags_info);

            let layout = device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create bindless layout: {:?}", e)
                })?;

            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: CAPACITY_SAMPLED,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::STORAGE_IMAGE,
                    descriptor_count: CAPACITY_STORAGE,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
                    descriptor_count: CAPACITY_ACCEL,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: CAPACITY_UNIFORM,
                },
            ];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND)
                .max_sets(1)
                .pool_sizes(&pool_sizes);

            let pool = device.create_descriptor_pool(&pool_info, None).map_err(|e| {
                engine_err!("radiant::vulkan", "Failed to create bindless pool: {:?}", e)
            })?;

            let layouts = [layout];
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            let set = device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to allocate bindless set: {:?}", e)
                })?[0];

            let sampler_info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .max_lod(vk::LOD_CLAMP_NONE);
            let default_sampler = device.create_sampler(&sampler_info, None).map_err(|e| {
                engine_err!("radiant::vulkan", "Failed to create default sampler: {:?}", e)
            })?;

            Ok(Self {
                device,
                registry: Mutex::new(BindlessRegistry::new(frames_in_flight)),
                layout,
                pool,
                set,
                default_sampler,
            })
        }
    }

    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub fn set(&self) -> vk::DescriptorSet {
        self.set
    }

    /// Linear clamp sampler used wherever no explicit sampler exists.
    pub fn default_sampler(&self) -> vk::Sampler {
        self.default_sampler
    }

    pub fn write_sampled_texture(&self, index: BindlessIndex, view: vk::ImageView) {
        if index.is_null() {
            return;
        }
        let image_info = [vk::DescriptorImageInfo::default()
            .sampler(self.default_sampler)
            .image_view(view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(BINDING_SAMPLED)
            .dst_array_element(index.get())
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);
        unsafe {
            self.device.update_descriptor_sets(&[write], &[]);
        }
    }

    pub fn write_storage_image(&self, index: BindlessIndex, view: vk::ImageView) {
        if index.is_null() {
            return;
        }
        let image_info = [vk::DescriptorImageInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::GENERAL)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(BINDING_STORAGE)
            .dst_array_element(index.get())
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(&image_info);
        unsafe {
            self.device.update_descriptor_sets(&[write], &[]);
        }
    }

    pub fn write_acceleration_structure(
        &self,
        index: BindlessIndex,
        accel: vk::AccelerationStructureKHR,
    ) {
        if index.is_null() {
            return;
        }
        let structures = [accel];
        let mut accel_write =
            vk::WriteDescriptorSetAccelerationStructureKHR::default()
                .acceleration_structures(&structures);
        let mut write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(BINDING_ACCEL)
            .dst_array_element(index.get())
            .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
            .push_next(&mut accel_write);
        write.descriptor_count = 1;
        unsafe {
            self.device.update_descriptor_sets(&[write], &[]);
        }
    }

    pub fn write_uniform_buffer(&self, index: BindlessIndex, buffer: vk::Buffer, size: u64) {
        if index.is_null() {
            return;
        }
        let buffer_info = [vk::DescriptorBufferInfo::default()
            .buffer(buffer)
            .offset(0)
            .range(size)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(BINDING_UNIFORM)
            .dst_array_element(index.get())
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info);
        unsafe {
            self.device.update_descriptor_sets(&[write], &[]);
        }
    }

    pub fn destroy(&self) {
        unsafe {
            self.device.destroy_sampler(self.default_sampler, None);
            self.device.destroy_descriptor_pool(self.pool, None);
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}
