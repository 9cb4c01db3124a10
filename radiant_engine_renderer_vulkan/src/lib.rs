/*!
# Radiant Engine - Vulkan Renderer Backend

Vulkan implementation of the `radiant_engine` graphics-device traits,
built on Ash with gpu-allocator for memory management.

Device requirements: Vulkan 1.3 (dynamic rendering, synchronization2)
plus `VK_KHR_acceleration_structure`, `VK_KHR_ray_query`,
`VK_KHR_deferred_host_operations`, `VK_EXT_vertex_input_dynamic_state`,
buffer device address, and descriptor indexing with update-after-bind.

The global bindless descriptor set (set 0) is owned by the device and
bound automatically with every pipeline; per-material sets bind at
set 1 and per-pass transient sets at set 4.
*/

// Internal modules
mod vulkan_context;
mod vulkan_swapchain;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_shader;
mod vulkan_bindless;
mod vulkan_pipeline;
mod vulkan_binding_group;
mod vulkan_command_list;
mod vulkan_accel;
mod vulkan_graphics_device;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

pub use vulkan_graphics_device::VulkanGraphicsDevice;
pub use vulkan_context::VulkanContext;
