/// Buffer - Vulkan implementation of the core Buffer trait.
///
/// Vertex and index buffers carry the acceleration-structure build
/// and device-address usages so BLAS builds can consume them directly.
/// CPU-visible buffers are persistently mapped; device-local ones
/// reject `update` (the engine uploads those through staging at
/// creation time).

use std::sync::{Arc, Mutex};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use radiant_engine::bindless::BindlessIndex;
use radiant_engine::error::Result;
use radiant_engine::{engine_bail, engine_err};
use radiant_engine::graphics_device::{Buffer as CoreBuffer, BufferDesc, BufferUsage};

pub struct Buffer {
    pub(crate) buffer: vk::Buffer,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) allocator: Arc<Mutex<Allocator>>,
    pub(crate) desc: BufferDesc,
    /// Slot in the bindless UBO array (uniform buffers only)
    pub(crate) bindless: BindlessIndex,
    /// Present on engine-visible buffers; the UBO slot returns here on
    /// drop. Backend-internal buffers carry no slot.
    pub(crate) bindless_table: Option<Arc<crate::vulkan_bindless::BindlessTable>>,
}

impl Buffer {
    pub fn new(
        device: Arc<ash::Device>,
        allocator: Arc<Mutex<Allocator>>,
        desc: BufferDesc,
        bindless: BindlessIndex,
        bindless_table: Arc<crate::vulkan_bindless::BindlessTable>,
    ) -> Result<Self> {
        let usage = Self::usage_flags(desc.usage);
        let location = if desc.cpu_visible {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        };

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(desc.size.max(4))
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device
                .create_buffer(&create_info, None)
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to create buffer: {:?}", e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let allocation = allocator
                .lock()
                .unwrap()
                .allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    device.destroy_buffer(buffer, None);
                    radiant_engine::error::Error::Allocation(format!(
                        "buffer '{}': {}",
                        desc.name, e
                    ))
                })?;

            device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to bind buffer: {:?}", e))?;

            Ok(Self {
                buffer,
                allocation: Some(allocation),
                device,
                allocator,
                desc,
                bindless,
                bindless_table: Some(bindless_table),
            })
        }
    }

    /// Backend-internal buffer with raw usage flags (acceleration
    /// structure storage, scratch, instance data).
    pub(crate) fn internal(
        device: Arc<ash::Device>,
        allocator: Arc<Mutex<Allocator>>,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        cpu_visible: bool,
    ) -> Result<Self> {
        let location = if cpu_visible {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        };

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size.max(4))
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device
                .create_buffer(&create_info, None)
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to create buffer: {:?}", e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let allocation = allocator
                .lock()
                .unwrap()
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    device.destroy_buffer(buffer, None);
                    radiant_engine::error::Error::Allocation(format!("buffer '{}': {}", name, e))
                })?;

            device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to bind buffer: {:?}", e))?;

            Ok(Self {
                buffer,
                allocation: Some(allocation),
                device,
                allocator,
                desc: BufferDesc {
                    name: name.to_string(),
                    size,
                    usage: BufferUsage::Storage,
                    cpu_visible,
                },
                bindless: BindlessIndex::NULL,
                bindless_table: None,
            })
        }
    }

    /// Write bytes through the persistent mapping (CPU-visible
    /// internal buffers only).
    pub(crate) fn write_mapped(&self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(mapped) = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
        else {
            engine_bail!(
                "radiant::vulkan",
                "write_mapped on unmapped buffer '{}'",
                self.desc.name
            );
        };
        unsafe {
            let dst = (mapped.as_ptr() as *mut u8).add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
        match usage {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
                    | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                    | vk::BufferUsageFlags::STORAGE_BUFFER
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
                    | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                    | vk::BufferUsageFlags::STORAGE_BUFFER
            }
            BufferUsage::Uniform => {
                vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Storage => {
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
            }
        }
    }

    /// Device address for acceleration-structure build inputs.
    pub fn device_address(&self) -> vk::DeviceAddress {
        unsafe {
            self.device.get_buffer_device_address(
                &vk::BufferDeviceAddressInfo::default().buffer(self.buffer),
            )
        }
    }

    pub fn raw(&self) -> vk::Buffer {
        self.buffer
    }
}

impl CoreBuffer for Buffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(allocation) = self.allocation.as_ref() else {
            engine_bail!("radiant::vulkan", "update on a freed buffer '{}'", self.desc.name);
        };
        let Some(mapped) = allocation.mapped_ptr() else {
            engine_bail!(
                "radiant::vulkan",
                "update on device-local buffer '{}'",
                self.desc.name
            );
        };
        if offset + data.len() as u64 > self.desc.size {
            engine_bail!(
                "radiant::vulkan",
                "update overruns buffer '{}' ({} + {} > {})",
                self.desc.name,
                offset,
                data.len(),
                self.desc.size
            );
        }

        unsafe {
            let dst = (mapped.as_ptr() as *mut u8).add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn bindless_index(&self) -> BindlessIndex {
        self.bindless
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(table) = &self.bindless_table {
            table.registry.lock().unwrap().free(
                radiant_engine::bindless::ResourceClass::UniformBuffer,
                self.bindless,
            );
        }
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.allocator.lock().unwrap().free(allocation).ok();
            }
            self.device.destroy_buffer(self.buffer, None);
        }
    }
}
