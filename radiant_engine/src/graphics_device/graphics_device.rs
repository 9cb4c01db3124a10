/// GraphicsDevice trait - backend factory and frame pump

use std::sync::{Arc, Mutex};
use crate::error::Result;
use super::acceleration_structure::{Blas, BlasDesc, Tlas};
use super::binding_group::{BindingGroup, BindingResource};
use super::buffer::{Buffer, BufferDesc};
use super::frame::FrameContext;
use super::pipeline::{
    ComputePipeline, ComputePipelineDesc, GraphicsPipeline, GraphicsPipelineDesc,
};
use super::shader::{Shader, ShaderDesc};
use super::texture::{Texture, TextureDesc, TextureFormat};

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Preferred number of frames in flight (clamped to the swapchain
    /// image count by the backend)
    pub frames_in_flight: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Radiant Application".to_string(),
            frames_in_flight: 2,
        }
    }
}

/// Capabilities reported by the backend after device creation.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCaps {
    /// Hardware ray tracing (acceleration structures + ray queries)
    pub ray_tracing: bool,
    /// Whether the TLAS supports transform-only refits
    pub tlas_refit: bool,
    /// Compute and graphics queues are distinct families
    pub dedicated_compute_queue: bool,
}

/// Per-frame device statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceStats {
    /// Draw calls recorded this frame
    pub draw_calls: u32,
    /// Compute dispatches recorded this frame
    pub dispatches: u32,
    /// GPU memory in use (bytes)
    pub gpu_memory_used: u64,
}

/// Pipeline reference for binding-group creation.
pub enum PipelineRef<'a> {
    Graphics(&'a dyn GraphicsPipeline),
    Compute(&'a dyn ComputePipeline),
}

/// Main device trait
///
/// Central factory for GPU resources plus the per-frame acquire/submit
/// pump. Implemented by backend devices (e.g. VulkanGraphicsDevice);
/// owned by the host and passed by reference, never a global.
pub trait GraphicsDevice: Send + Sync {
    /// Backend capabilities.
    fn caps(&self) -> DeviceCaps;

    /// Number of frames in flight (equals the swapchain image count).
    fn frames_in_flight(&self) -> u32;

    /// Current swapchain extent in pixels.
    fn swapchain_extent(&self) -> (u32, u32);

    /// Format of the swapchain images.
    fn swapchain_format(&self) -> TextureFormat;

    // ----- resource factories -----

    /// Create a texture. Sampled/storage usages register bindless
    /// slots that stay stable for the texture's lifetime.
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a buffer. Uniform buffers are registered in the bindless
    /// UBO array at creation and keep their slot for life (cascade
    /// level infos, camera data).
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a shader module.
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a graphics pipeline (dynamic rendering).
    fn create_graphics_pipeline(
        &mut self,
        desc: GraphicsPipelineDesc,
    ) -> Result<Arc<dyn GraphicsPipeline>>;

    /// Create a compute pipeline.
    fn create_compute_pipeline(
        &mut self,
        desc: ComputePipelineDesc,
    ) -> Result<Arc<dyn ComputePipeline>>;

    /// Create a binding group for `set_index` of a pipeline's layout.
    fn create_binding_group(
        &mut self,
        pipeline: PipelineRef,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    // ----- acceleration structures -----

    /// Build a BLAS from a mesh's buffers. Fails with a build error on
    /// allocation failure or an unsupported vertex format.
    fn create_blas(&mut self, desc: BlasDesc) -> Result<Arc<dyn Blas>>;

    /// Create an empty TLAS with a stable bindless index.
    fn create_tlas(&mut self) -> Result<Arc<Mutex<dyn Tlas>>>;

    // ----- frame pump -----

    /// Wait for the next frame slot's fence, acquire a swapchain
    /// image, and hand out the frame's command lists.
    ///
    /// Returns `Error::SwapchainLost` when the swapchain is out of
    /// date; the caller recreates via `resize` and skips the frame.
    fn acquire_frame(&mut self) -> Result<FrameContext>;

    /// Submit the frame's lists (compute before graphics, semaphore
    /// between them) and present.
    ///
    /// Returns `Error::SwapchainLost` when presentation hit an
    /// out-of-date swapchain; the frame's work is abandoned.
    fn submit_frame(&mut self, frame: FrameContext) -> Result<()>;

    /// Block until all GPU work completes.
    fn wait_idle(&self) -> Result<()>;

    /// Recreate the swapchain at a new extent.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Statistics for the last completed frame.
    fn stats(&self) -> DeviceStats;
}
