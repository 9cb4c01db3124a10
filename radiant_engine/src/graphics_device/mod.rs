/// Graphics device module - backend abstraction traits and descriptors
///
/// The core records all GPU work against these traits. Backends
/// (Vulkan) implement them; tests use the mock device.

// Module declarations
pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod shader;
pub mod pipeline;
pub mod command_list;
pub mod binding_group;
pub mod acceleration_structure;
pub mod frame;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use texture::*;
pub use buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use command_list::*;
pub use binding_group::*;
pub use acceleration_structure::*;
pub use frame::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
