/// FrameContext — per-frame resources owned by one frame in flight.
///
/// The device hands out a context on acquire; everything in it is
/// owned exclusively by this frame until its fence signals. There are
/// `F` contexts (F = swapchain image count), each with one compute and
/// one graphics command list.

use std::sync::{Arc, Mutex};
use super::command_list::CommandList;

/// Per-frame state for recording and submission.
pub struct FrameContext {
    /// Frame-in-flight slot, in [0, frames_in_flight)
    pub frame_index: u32,
    /// Swapchain image acquired for this frame
    pub image_index: u32,
    /// Command list submitted to the compute queue (TLAS update,
    /// tracer, merger, integrator)
    pub compute_list: Arc<Mutex<dyn CommandList>>,
    /// Command list submitted to the graphics queue (G-buffer,
    /// outline, present transitions)
    pub graphics_list: Arc<Mutex<dyn CommandList>>,
}
