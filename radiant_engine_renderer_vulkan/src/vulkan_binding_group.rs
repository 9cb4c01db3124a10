/// BindingGroup - Vulkan descriptor-set implementation.
///
/// Covers the non-bindless sets: per-material (set 1) and per-pass
/// transient (set 4). Sets allocate from a shared free-able pool and
/// return on drop.

use std::sync::{Arc, Mutex};
use ash::vk;
use radiant_engine::error::Result;
use radiant_engine::engine_err;
use radiant_engine::graphics_device::{
    BindingGroup as CoreBindingGroup, BindingResource, Buffer as CoreBuffer,
    Texture as CoreTexture,
};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_texture::Texture;

/// Downcasts, sound within this backend: all resources the device
/// hands out are this crate's concrete types.
unsafe fn as_vulkan_texture(texture: &dyn CoreTexture) -> &Texture {
    &*(texture as *const dyn CoreTexture as *const Texture)
}

unsafe fn as_vulkan_buffer(buffer: &dyn CoreBuffer) -> &Buffer {
    &*(buffer as *const dyn CoreBuffer as *const Buffer)
}

pub struct BindingGroup {
    pub(crate) set: vk::DescriptorSet,
    set_index: u32,
    device: Arc<ash::Device>,
    pool: Arc<Mutex<vk::DescriptorPool>>,
}

impl BindingGroup {
    pub fn new(
        device: Arc<ash::Device>,
        pool: Arc<Mutex<vk::DescriptorPool>>,
        layout: vk::DescriptorSetLayout,
        set_index: u32,
        sampler: vk::Sampler,
        resources: &[BindingResource],
    ) -> Result<Self> {
        unsafe {
            let layouts = [layout];
            let pool_guard = pool.lock().unwrap();
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(*pool_guard)
                .set_layouts(&layouts);
            let set = device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to allocate descriptor set: {:?}", e)
                })?[0];
            drop(pool_guard);

            // Written immediately; the infos must outlive the update.
            let mut image_infos = Vec::new();
            let mut buffer_infos = Vec::new();
            for resource in resources {
                match resource {
                    BindingResource::SampledTexture(texture) => {
                        image_infos.push(
                            vk::DescriptorImageInfo::default()
                                .sampler(sampler)
                                .image_view(as_vulkan_texture(*texture).raw_view())
                                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                        );
                    }
                    BindingResource::StorageImage(texture) => {
                        image_infos.push(
                            vk::DescriptorImageInfo::default()
                                .image_view(as_vulkan_texture(*texture).raw_view())
                                .image_layout(vk::ImageLayout::GENERAL),
                        );
                    }
                    BindingResource::UniformBuffer(buffer)
                    | BindingResource::StorageBuffer(buffer) => {
                        let vulkan_buffer = as_vulkan_buffer(*buffer);
                        buffer_infos.push(
                            vk::DescriptorBufferInfo::default()
                                .buffer(vulkan_buffer.raw())
                                .range(vulkan_buffer.desc().size),
                        );
                    }
                }
            }

            let mut writes = Vec::new();
            let mut image_cursor = 0usize;
            let mut buffer_cursor = 0usize;
            for (binding, resource) in resources.iter().enumerate() {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(binding as u32);
                match resource {
                    BindingResource::SampledTexture(_) => {
                        writes.push(
                            write
                                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                                .image_info(std::slice::from_ref(&image_infos[image_cursor])),
                        );
                        image_cursor += 1;
                    }
                    BindingResource::StorageImage(_) => {
                        writes.push(
                            write
                                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                                .image_info(std::slice::from_ref(&image_infos[image_cursor])),
                        );
                        image_cursor += 1;
                    }
                    BindingResource::UniformBuffer(_) => {
                        writes.push(
                            write
                                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                                .buffer_info(std::slice::from_ref(&buffer_infos[buffer_cursor])),
                        );
                        buffer_cursor += 1;
                    }
                    BindingResource::StorageBuffer(_) => {
                        writes.push(
                            write
                                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                                .buffer_info(std::slice::from_ref(&buffer_infos[buffer_cursor])),
                        );
                        buffer_cursor += 1;
                    }
                }
            }

            if !writes.is_empty() {
                device.update_descriptor_sets(&writes, &[]);
            }

            Ok(Self {
                set,
                set_index,
                device,
                pool,
            })
        }
    }
}

impl CoreBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        unsafe {
            let pool = self.pool.lock().unwrap();
            self.device.free_descriptor_sets(*pool, &[self.set]).ok();
        }
    }
}
