/// Acceleration structures - BLAS and TLAS over
/// VK_KHR_acceleration_structure.
///
/// BLAS builds run at creation on the compute queue and block until
/// complete; the mesh buffers already carry the build-input usage.
/// The TLAS is built with ALLOW_UPDATE so transform-only patches can
/// refit instead of rebuilding; instance additions or removals force a
/// full rebuild. Its bindless slot is allocated once and rewritten in
/// place, so the index is stable across updates.

use std::sync::{Arc, Mutex};
use ash::vk;
use glam::Mat4;
use gpu_allocator::vulkan::Allocator;
use radiant_engine::bindless::{BindlessIndex, ResourceClass};
use radiant_engine::error::{Error, Result};
use radiant_engine::engine_err;
use radiant_engine::graphics_device::{
    Blas as CoreBlas, BlasDesc, Buffer as _, IndexType, Tlas as CoreTlas, TlasInstance,
};
use crate::vulkan_bindless::BindlessTable;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::VulkanContext;

/// Shared handles the acceleration structures need from the context.
#[derive(Clone)]
pub struct AccelShared {
    pub device: Arc<ash::Device>,
    pub allocator: Arc<Mutex<Allocator>>,
    pub accel_loader: ash::khr::acceleration_structure::Device,
    pub compute_queue: vk::Queue,
    pub compute_family: u32,
}

impl AccelShared {
    pub fn from_context(context: &VulkanContext) -> Self {
        Self {
            device: context.device.clone(),
            allocator: context.allocator.clone(),
            accel_loader: context.accel_loader.clone(),
            compute_queue: context.compute_queue,
            compute_family: context.queue_families.compute,
        }
    }

    /// Record one-time commands, submit on the compute queue, wait.
    fn submit_once<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(self.compute_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);
            let pool = self
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to create pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = match self.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    self.device.destroy_command_pool(pool, None);
                    return Err(engine_err!(
                        "radiant::vulkan",
                        "Failed to allocate command buffer: {:?}",
                        e
                    ));
                }
            };

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("radiant::vulkan", "begin failed: {:?}", e))?;

            record(command_buffer);

            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("radiant::vulkan", "end failed: {:?}", e))?;

            let fence = self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!("radiant::vulkan", "fence creation failed: {:?}", e))?;
            let buffers = [command_buffer];
            let submit = vk::SubmitInfo::default().command_buffers(&buffers);
            let result = self
                .device
                .queue_submit(self.compute_queue, &[submit], fence)
                .map_err(|e| engine_err!("radiant::vulkan", "submit failed: {:?}", e))
                .and_then(|_| {
                    self.device
                        .wait_for_fences(&[fence], true, u64::MAX)
                        .map_err(|e| engine_err!("radiant::vulkan", "fence wait failed: {:?}", e))
                });

            self.device.destroy_fence(fence, None);
            self.device.destroy_command_pool(pool, None);
            result
        }
    }
}

// ===== BLAS =====

pub struct Blas {
    shared: AccelShared,
    accel: vk::AccelerationStructureKHR,
    /// Backing storage, kept alive for the structure's lifetime
    _storage: Buffer,
    device_address: vk::DeviceAddress,
    name: String,
    triangle_count: u32,
}

impl Blas {
    pub fn new(shared: AccelShared, desc: BlasDesc) -> Result<Self> {
        if desc.index_count % 3 != 0 {
            return Err(Error::Build(format!(
                "BLAS '{}': index count {} is not a multiple of 3",
                desc.name, desc.index_count
            )));
        }
        if desc.vertex_stride < 12 {
            return Err(Error::Build(format!(
                "BLAS '{}': vertex stride {} cannot hold a vec3 position",
                desc.name, desc.vertex_stride
            )));
        }

        let triangle_count = desc.index_count / 3;

        unsafe {
            // The core hands out this backend's buffers; recover the
            // device addresses for the build inputs.
            let vertex_buffer =
                &*(desc.vertex_buffer.as_ref() as *const dyn radiant_engine::graphics_device::Buffer
                    as *const Buffer);
            let index_buffer =
                &*(desc.index_buffer.as_ref() as *const dyn radiant_engine::graphics_device::Buffer
                    as *const Buffer);

            let triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::default()
                .vertex_format(vk::Format::R32G32B32_SFLOAT)
                .vertex_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: vertex_buffer.device_address() + desc.position_offset as u64,
                })
                .vertex_stride(desc.vertex_stride as u64)
                .max_vertex(desc.vertex_count.saturating_sub(1))
                .index_type(match desc.index_type {
                    IndexType::U16 => vk::IndexType::UINT16,
                    IndexType::U32 => vk::IndexType::UINT32,
                })
                .index_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: index_buffer.device_address(),
                });

            let geometry = vk::AccelerationStructureGeometryKHR::default()
                .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
                .geometry(vk::AccelerationStructureGeometryDataKHR { triangles })
                .flags(vk::GeometryFlagsKHR::OPAQUE);
            let geometries = [geometry];

            let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
                .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL)
                .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
                .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
                .geometries(&geometries);

            let mut sizes = vk::AccelerationStructureBuildSizesInfoKHR::default();
            shared.accel_loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &build_info,
                &[triangle_count],
                &mut sizes,
            );

            let storage = Buffer::internal(
                shared.device.clone(),
                shared.allocator.clone(),
                &format!("{}_storage", desc.name),
                sizes.acceleration_structure_size,
                vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
                false,
            )
            .map_err(|e| Error::Build(format!("BLAS '{}': {}", desc.name, e)))?;

            let create_info = vk::AccelerationStructureCreateInfoKHR::default()
                .buffer(storage.raw())
                .size(sizes.acceleration_structure_size)
                .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL);
            let accel = shared
                .accel_loader
                .create_acceleration_structure(&create_info, None)
                .map_err(|e| Error::Build(format!("BLAS '{}': {:?}", desc.name, e)))?;

            let scratch = Buffer::internal(
                shared.device.clone(),
                shared.allocator.clone(),
                &format!("{}_scratch", desc.name),
                sizes.build_scratch_size,
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
                false,
            )
            .map_err(|e| Error::Build(format!("BLAS '{}': {}", desc.name, e)))?;

            build_info = build_info
                .dst_acceleration_structure(accel)
                .scratch_data(vk::DeviceOrHostAddressKHR {
                    device_address: scratch.device_address(),
                });

            let range = vk::AccelerationStructureBuildRangeInfoKHR::default()
                .primitive_count(triangle_count);
            let accel_loader = shared.accel_loader.clone();
            shared.submit_once(|command_buffer| {
                accel_loader.cmd_build_acceleration_structures(
                    command_buffer,
                    &[build_info],
                    &[&[range]],
                );
            })?;

            let device_address = shared.accel_loader.get_acceleration_structure_device_address(
                &vk::AccelerationStructureDeviceAddressInfoKHR::default()
                    .acceleration_structure(accel),
            );

            Ok(Self {
                shared,
                accel,
                _storage: storage,
                device_address,
                name: desc.name,
                triangle_count,
            })
        }
    }

    pub fn device_address(&self) -> vk::DeviceAddress {
        self.device_address
    }
}

impl CoreBlas for Blas {
    fn name(&self) -> &str {
        &self.name
    }

    fn triangle_count(&self) -> u32 {
        self.triangle_count
    }
}

impl Drop for Blas {
    fn drop(&mut self) {
        unsafe {
            self.shared
                .accel_loader
                .destroy_acceleration_structure(self.accel, None);
        }
    }
}

// ===== TLAS =====

pub struct Tlas {
    shared: AccelShared,
    bindless_table: Arc<BindlessTable>,
    instances: Vec<TlasInstance>,
    instance_buffer: Option<Buffer>,
    accel: Option<vk::AccelerationStructureKHR>,
    storage: Option<Buffer>,
    built: bool,
    bindless: BindlessIndex,
}

impl Tlas {
    pub fn new(shared: AccelShared, bindless_table: Arc<BindlessTable>) -> Result<Self> {
        let bindless = bindless_table
            .registry
            .lock()
            .unwrap()
            .allocate(ResourceClass::AccelerationStructure)?;
        Ok(Self {
            shared,
            bindless_table,
            instances: Vec::new(),
            instance_buffer: None,
            accel: None,
            storage: None,
            built: false,
            bindless,
        })
    }

    /// Row-major 3x4 transform as the API expects it.
    fn vk_transform(matrix: &Mat4) -> vk::TransformMatrixKHR {
        let transposed = matrix.transpose().to_cols_array();
        let mut transform = vk::TransformMatrixKHR { matrix: [0.0; 12] };
        transform.matrix.copy_from_slice(&transposed[0..12]);
        transform
    }

    /// Refresh the whole instance buffer from `self.instances`,
    /// growing it when needed.
    fn upload_instances(&mut self) -> Result<()> {
        let data: Vec<vk::AccelerationStructureInstanceKHR> = self
            .instances
            .iter()
            .enumerate()
            .map(|(index, instance)| unsafe {
                let blas = &*(instance.blas.as_ref() as *const dyn CoreBlas as *const Blas);
                vk::AccelerationStructureInstanceKHR {
                    transform: Self::vk_transform(&instance.transform),
                    instance_custom_index_and_mask: vk::Packed24_8::new(index as u32, 0xFF),
                    instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
                        0,
                        vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE
                            .as_raw() as u8,
                    ),
                    acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
                        device_handle: blas.device_address(),
                    },
                }
            })
            .collect();

        let needed = (data.len() * std::mem::size_of::<vk::AccelerationStructureInstanceKHR>())
            as u64;
        let recreate = self
            .instance_buffer
            .as_ref()
            .map(|buffer| buffer.desc().size < needed)
            .unwrap_or(true);
        if recreate {
            self.instance_buffer = Some(Buffer::internal(
                self.shared.device.clone(),
                self.shared.allocator.clone(),
                "tlas_instances",
                needed,
                vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
                true,
            )?);
        }

        self.instance_buffer
            .as_ref()
            .unwrap()
            .write_mapped(0, bytemuck_bytes(&data))
    }

    /// Build or refit the top-level structure over the current
    /// instance buffer.
    fn build_internal(&mut self, refit: bool) -> Result<()> {
        let instance_count = self.instances.len() as u32;
        let instance_buffer = self.instance_buffer.as_ref().ok_or_else(|| {
            Error::Precondition("TLAS build before instance upload".to_string())
        })?;

        unsafe {
            let geometry = vk::AccelerationStructureGeometryKHR::default()
                .geometry_type(vk::GeometryTypeKHR::INSTANCES)
                .geometry(vk::AccelerationStructureGeometryDataKHR {
                    instances: vk::AccelerationStructureGeometryInstancesDataKHR::default()
                        .data(vk::DeviceOrHostAddressConstKHR {
                            device_address: instance_buffer.device_address(),
                        }),
                });
            let geometries = [geometry];

            let mode = if refit && self.accel.is_some() {
                vk::BuildAccelerationStructureModeKHR::UPDATE
            } else {
                vk::BuildAccelerationStructureModeKHR::BUILD
            };

            let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
                .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
                .flags(
                    vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE
                        | vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE,
                )
                .mode(mode)
                .geometries(&geometries);

            let mut sizes = vk::AccelerationStructureBuildSizesInfoKHR::default();
            self.shared
                .accel_loader
                .get_acceleration_structure_build_sizes(
                    vk::AccelerationStructureBuildTypeKHR::DEVICE,
                    &build_info,
                    &[instance_count],
                    &mut sizes,
                );

            // Full rebuilds recreate the structure when the storage is
            // missing or too small; refits reuse it.
            if mode == vk::BuildAccelerationStructureModeKHR::BUILD {
                let storage_too_small = self
                    .storage
                    .as_ref()
                    .map(|buffer| buffer.desc().size < sizes.acceleration_structure_size)
                    .unwrap_or(true);
                if storage_too_small {
                    if let Some(old) = self.accel.take() {
                        self.shared.accel_loader.destroy_acceleration_structure(old, None);
                    }
                    let storage = Buffer::internal(
                        self.shared.device.clone(),
                        self.shared.allocator.clone(),
                        "tlas_storage",
                        sizes.acceleration_structure_size,
                        vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
                            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
                        false,
                    )?;
                    let create_info = vk::AccelerationStructureCreateInfoKHR::default()
                        .buffer(storage.raw())
                        .size(sizes.acceleration_structure_size)
                        .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL);
                    let accel = self
                        .shared
                        .accel_loader
                        .create_acceleration_structure(&create_info, None)
                        .map_err(|e| Error::Build(format!("TLAS: {:?}", e)))?;
                    self.storage = Some(storage);
                    self.accel = Some(accel);
                }
            }

            let accel = self.accel.ok_or_else(|| {
                Error::Precondition("TLAS refit before any build".to_string())
            })?;

            let scratch_size = if mode == vk::BuildAccelerationStructureModeKHR::UPDATE {
                sizes.update_scratch_size
            } else {
                sizes.build_scratch_size
            };
            let scratch = Buffer::internal(
                self.shared.device.clone(),
                self.shared.allocator.clone(),
                "tlas_scratch",
                scratch_size,
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
                false,
            )?;

            build_info = build_info
                .src_acceleration_structure(if mode == vk::BuildAccelerationStructureModeKHR::UPDATE {
                    accel
                } else {
                    vk::AccelerationStructureKHR::null()
                })
                .dst_acceleration_structure(accel)
                .scratch_data(vk::DeviceOrHostAddressKHR {
                    device_address: scratch.device_address(),
                });

            let range = vk::AccelerationStructureBuildRangeInfoKHR::default()
                .primitive_count(instance_count);
            let accel_loader = self.shared.accel_loader.clone();
            self.shared.submit_once(|command_buffer| {
                accel_loader.cmd_build_acceleration_structures(
                    command_buffer,
                    &[build_info],
                    &[&[range]],
                );
            })?;

            // The bindless slot is stable; rewrite it in place.
            self.bindless_table
                .write_acceleration_structure(self.bindless, accel);
        }
        Ok(())
    }
}

/// The instance records are plain-old-data for the API.
fn bytemuck_bytes(data: &[vk::AccelerationStructureInstanceKHR]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            data.as_ptr() as *const u8,
            std::mem::size_of_val(data),
        )
    }
}

impl CoreTlas for Tlas {
    fn add_instance(&mut self, instance: TlasInstance) {
        self.instances.push(instance);
        self.built = false;
    }

    fn update_instances(&mut self, updates: &[(usize, Mat4)]) -> Result<()> {
        for &(index, transform) in updates {
            let instance = self.instances.get_mut(index).ok_or_else(|| {
                Error::Precondition(format!("instance index {} out of range", index))
            })?;
            instance.transform = transform;
        }
        if self.built {
            // Transform-only patch: refresh the instance buffer and
            // refit in place.
            self.upload_instances()?;
            self.build_internal(true)?;
        }
        Ok(())
    }

    fn build(&mut self) -> Result<()> {
        if self.instances.is_empty() {
            return Err(Error::Build("TLAS build with no instances".to_string()));
        }
        self.upload_instances()?;
        self.build_internal(false)?;
        self.built = true;
        Ok(())
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn clear(&mut self) {
        self.instances.clear();
        self.built = false;
    }

    fn bindless_index(&self) -> BindlessIndex {
        self.bindless
    }
}

impl Drop for Tlas {
    fn drop(&mut self) {
        unsafe {
            if let Some(accel) = self.accel.take() {
                self.shared.accel_loader.destroy_acceleration_structure(accel, None);
            }
        }
        self.bindless_table
            .registry
            .lock()
            .unwrap()
            .free(ResourceClass::AccelerationStructure, self.bindless);
    }
}
