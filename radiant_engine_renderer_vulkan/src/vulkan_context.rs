/// VulkanContext - instance, device, queues, and allocator bring-up.
///
/// Picks the first physical device that offers the full ray-tracing
/// extension set and both a graphics and a compute queue. The compute
/// queue prefers a dedicated family; when none exists it shares the
/// graphics family, which the rest of the backend supports with the
/// same barrier semantics.

use std::ffi::CStr;
use std::sync::{Arc, Mutex};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;
use radiant_engine::error::{Error, Result};
use radiant_engine::{engine_err, engine_info};
use radiant_engine::graphics_device::DeviceConfig;

/// Device extensions the backend requires.
const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 5] = [
    ash::khr::swapchain::NAME,
    ash::khr::acceleration_structure::NAME,
    ash::khr::ray_query::NAME,
    ash::khr::deferred_host_operations::NAME,
    ash::ext::vertex_input_dynamic_state::NAME,
];

/// Queue family indices selected at device creation.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub compute: u32,
}

impl QueueFamilies {
    pub fn dedicated_compute(&self) -> bool {
        self.graphics != self.compute
    }
}

pub struct VulkanContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: Arc<ash::Device>,
    pub queue_families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub compute_queue: vk::Queue,
    pub allocator: Arc<Mutex<Allocator>>,
    pub swapchain_loader: ash::khr::swapchain::Device,
    pub accel_loader: ash::khr::acceleration_structure::Device,
    pub vertex_input_loader: ash::ext::vertex_input_dynamic_state::Device,
    #[cfg(feature = "vulkan-validation")]
    debug: crate::vulkan_debug::DebugMessenger,
}

impl VulkanContext {
    pub fn new(window: &Window, config: &DeviceConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_err!("radiant::vulkan", "Failed to load Vulkan library: {}", e)
            })?;

            let instance = Self::create_instance(&entry, window, config)?;

            #[cfg(feature = "vulkan-validation")]
            let debug = crate::vulkan_debug::DebugMessenger::new(&entry, &instance, config)?;

            let display_handle = window.display_handle().map_err(|e| {
                engine_err!("radiant::vulkan", "No display handle: {}", e)
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                engine_err!("radiant::vulkan", "No window handle: {}", e)
            })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| engine_err!("radiant::vulkan", "Failed to create surface: {:?}", e))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_families) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let device = Self::create_device(&instance, physical_device, queue_families)?;
            let device = Arc::new(device);

            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let compute_queue = device.get_device_queue(queue_families.compute, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: (*device).clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: true,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| engine_err!("radiant::vulkan", "Failed to create allocator: {}", e))?;

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
            let accel_loader = ash::khr::acceleration_structure::Device::new(&instance, &device);
            let vertex_input_loader =
                ash::ext::vertex_input_dynamic_state::Device::new(&instance, &device);

            engine_info!(
                "radiant::vulkan",
                "device ready (graphics family {}, compute family {})",
                queue_families.graphics,
                queue_families.compute
            );

            Ok(Self {
                entry,
                instance,
                surface,
                surface_loader,
                physical_device,
                device,
                queue_families,
                graphics_queue,
                compute_queue,
                allocator: Arc::new(Mutex::new(allocator)),
                swapchain_loader,
                accel_loader,
                vertex_input_loader,
                #[cfg(feature = "vulkan-validation")]
                debug,
            })
        }
    }

    unsafe fn create_instance(
        entry: &ash::Entry,
        window: &Window,
        config: &DeviceConfig,
    ) -> Result<ash::Instance> {
        let app_name = std::ffi::CString::new(config.app_name.clone())
            .unwrap_or_else(|_| std::ffi::CString::new("Radiant").unwrap());

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"radiant_engine")
            .api_version(vk::API_VERSION_1_3);

        let display_handle = window
            .display_handle()
            .map_err(|e| engine_err!("radiant::vulkan", "No display handle: {}", e))?;
        let mut extensions =
            ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Surface extensions unavailable: {:?}", e)
                })?
                .to_vec();

        #[cfg(feature = "vulkan-validation")]
        if config.enable_validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions);

        #[cfg(feature = "vulkan-validation")]
        let layers = crate::vulkan_debug::validation_layers(entry, config);
        #[cfg(feature = "vulkan-validation")]
        {
            create_info = create_info.enabled_layer_names(&layers);
        }

        entry
            .create_instance(&create_info, None)
            .map_err(|e| engine_err!("radiant::vulkan", "Failed to create instance: {:?}", e))
    }

    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_err!("radiant::vulkan", "Failed to enumerate devices: {:?}", e)
        })?;

        for physical_device in devices {
            if !Self::supports_required_extensions(instance, physical_device) {
                continue;
            }
            let Some(queue_families) =
                Self::find_queue_families(instance, surface_loader, surface, physical_device)
            else {
                continue;
            };

            let properties = instance.get_physical_device_properties(physical_device);
            let name = CStr::from_ptr(properties.device_name.as_ptr());
            engine_info!(
                "radiant::vulkan",
                "selected physical device: {}",
                name.to_string_lossy()
            );
            return Ok((physical_device, queue_families));
        }

        Err(Error::InitializationFailed(
            "no physical device with ray-tracing support".to_string(),
        ))
    }

    unsafe fn supports_required_extensions(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> bool {
        let Ok(available) = instance.enumerate_device_extension_properties(physical_device)
        else {
            return false;
        };

        REQUIRED_DEVICE_EXTENSIONS.iter().all(|required| {
            available.iter().any(|ext| {
                CStr::from_ptr(ext.extension_name.as_ptr()) == *required
            })
        })
    }

    /// Graphics family must present to the surface; compute prefers a
    /// dedicated family.
    unsafe fn find_queue_families(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Option<QueueFamilies> {
        let families = instance.get_physical_device_queue_family_properties(physical_device);

        let mut graphics = None;
        let mut dedicated_compute = None;
        let mut any_compute = None;

        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            let supports_graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let supports_compute = family.queue_flags.contains(vk::QueueFlags::COMPUTE);

            if supports_graphics && graphics.is_none() {
                let presents = surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false);
                if presents {
                    graphics = Some(index);
                }
            }
            if supports_compute {
                any_compute.get_or_insert(index);
                if !supports_graphics {
                    dedicated_compute.get_or_insert(index);
                }
            }
        }

        Some(QueueFamilies {
            graphics: graphics?,
            compute: dedicated_compute.or(any_compute)?,
        })
    }

    unsafe fn create_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: QueueFamilies,
    ) -> Result<ash::Device> {
        let priorities = [1.0f32];
        let mut queue_infos = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_families.graphics)
            .queue_priorities(&priorities)];
        if queue_families.dedicated_compute() {
            queue_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_families.compute)
                    .queue_priorities(&priorities),
            );
        }

        let extension_names: Vec<*const i8> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let mut features12 = vk::PhysicalDeviceVulkan12Features::default()
            .buffer_device_address(true)
            .descriptor_indexing(true)
            .runtime_descriptor_array(true)
            .descriptor_binding_partially_bound(true)
            .descriptor_binding_sampled_image_update_after_bind(true)
            .descriptor_binding_storage_image_update_after_bind(true)
            .descriptor_binding_uniform_buffer_update_after_bind(true)
            .shader_sampled_image_array_non_uniform_indexing(true);

        let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(true);

        let mut accel_features =
            vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default()
                .acceleration_structure(true);

        let mut ray_query_features =
            vk::PhysicalDeviceRayQueryFeaturesKHR::default().ray_query(true);

        let mut vertex_input_features =
            vk::PhysicalDeviceVertexInputDynamicStateFeaturesEXT::default()
                .vertex_input_dynamic_state(true);

        let features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(true)
            .fragment_stores_and_atomics(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features)
            .push_next(&mut features12)
            .push_next(&mut features13)
            .push_next(&mut accel_features)
            .push_next(&mut ray_query_features)
            .push_next(&mut vertex_input_features);

        instance
            .create_device(physical_device, &create_info, None)
            .map_err(|e| engine_err!("radiant::vulkan", "Failed to create device: {:?}", e))
    }

    /// Submit a recorded command buffer and block until it completes.
    /// Used for one-time work (BLAS/TLAS builds, uploads).
    pub fn submit_and_wait(
        &self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
    ) -> Result<()> {
        unsafe {
            let fence = self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to create fence: {:?}", e))?;

            let buffers = [command_buffer];
            let submit = vk::SubmitInfo::default().command_buffers(&buffers);
            let result = self
                .device
                .queue_submit(queue, &[submit], fence)
                .map_err(|e| engine_err!("radiant::vulkan", "Submit failed: {:?}", e));

            if result.is_ok() {
                self.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| engine_err!("radiant::vulkan", "Fence wait failed: {:?}", e))?;
            }
            self.device.destroy_fence(fence, None);
            result
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            #[cfg(feature = "vulkan-validation")]
            self.debug.destroy();
            self.instance.destroy_instance(None);
        }
    }
}
