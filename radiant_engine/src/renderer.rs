/// Renderer — host-owned frame orchestrator.
///
/// One value, owned by the host, no globals. Per frame it drives the
/// pipeline in the fixed order:
///
///   scene maintenance -> TLAS build/refit -> cascade trace (compute)
///   -> cascade merge (compute) -> G-buffer (graphics) -> selection
///   outline (graphics) -> present
///
/// Compute work records on the frame's compute list, raster work on
/// its graphics list; the device submits compute before graphics with
/// a semaphore between them. Swapchain loss abandons the frame after
/// the failing call: the GI textures keep last-good data and the next
/// frame starts from a recreated swapchain.

use std::sync::{Arc, Mutex};
use bytemuck::{Pod, Zeroable};
use crate::bindless::BindlessIndex;
use crate::cascade::cascades_3d::CascadeShaders3D;
use crate::cascade::{CascadeConfig3D, RadianceCascades3D};
use crate::error::{Error, Result};
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, GraphicsDevice};
use crate::passes::{GBufferPass, GBufferShaders, OutlinePass, OutlineShaders};
use crate::scene::{Scene, Updater};

/// Per-frame camera data mirrored into one UBO slice per frame in
/// flight.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view: [f32; 16],
    projection: [f32; 16],
    view_projection: [f32; 16],
    position: [f32; 4],
}

/// All shaders the renderer needs, provided by the host.
pub struct RendererShaders {
    pub gbuffer: GBufferShaders,
    pub outline: OutlineShaders,
    pub cascades: CascadeShaders3D,
}

/// Counters for the last rendered frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    /// Draws that survived frustum culling
    pub draw_calls: u32,
    /// Whether the GI chain ran (false while the TLAS is empty)
    pub gi_dispatched: bool,
    /// Frames completed since creation
    pub frames: u64,
}

pub struct Renderer {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    cascades: RadianceCascades3D,
    gbuffer: GBufferPass,
    outline: OutlinePass,
    camera_buffers: Vec<Arc<dyn Buffer>>,
    frames_in_flight: u32,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        cascade_config: CascadeConfig3D,
        shaders: RendererShaders,
    ) -> Result<Self> {
        let mut device_guard = device.lock().unwrap();
        let frames_in_flight = device_guard.frames_in_flight();

        let cascades =
            RadianceCascades3D::new(&mut *device_guard, cascade_config, shaders.cascades)?;
        let gbuffer = GBufferPass::new(&mut *device_guard, shaders.gbuffer)?;
        let outline = OutlinePass::new(&mut *device_guard, shaders.outline)?;

        // One camera UBO slice per frame in flight, all in the
        // bindless UBO array.
        let mut camera_buffers = Vec::with_capacity(frames_in_flight as usize);
        for frame in 0..frames_in_flight {
            camera_buffers.push(device_guard.create_buffer(BufferDesc {
                name: format!("[Renderer] Camera Data: {}", frame),
                size: std::mem::size_of::<CameraUniform>() as u64,
                usage: BufferUsage::Uniform,
                cpu_visible: true,
            })?);
        }
        drop(device_guard);

        Ok(Self {
            device,
            cascades,
            gbuffer,
            outline,
            camera_buffers,
            frames_in_flight,
            stats: RenderStats::default(),
        })
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn cascades(&self) -> &RadianceCascades3D {
        &self.cascades
    }

    pub fn outline_mut(&mut self) -> &mut OutlinePass {
        &mut self.outline
    }

    /// Recreate the swapchain and every extent-dependent resource.
    /// Cascade resources are extent-independent and untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let mut device_guard = self.device.lock().unwrap();
        device_guard.resize(width, height)?;
        self.gbuffer.resize(&mut *device_guard, width, height)
    }

    /// Render one frame.
    ///
    /// Swapchain loss is absorbed here: the frame is dropped, the
    /// swapchain recreated, and `Ok` returned. Every other error
    /// propagates.
    pub fn render_frame(&mut self, scene: &mut Scene) -> Result<()> {
        // CPU maintenance: world bounds, DBVH, TLAS transform deltas,
        // dirty-bit ageing.
        Updater::run(scene, self.frames_in_flight)?;

        // Instance list changed: rebuild the TLAS. An empty scene is
        // not an error for the frame, the GI passes just skip.
        if scene.tlas_dirty() {
            match scene.build_tlas() {
                Ok(()) => {}
                Err(Error::Build(message)) => {
                    crate::engine_warn!(
                        "radiant::Renderer",
                        "TLAS rebuild skipped: {}",
                        message
                    );
                }
                Err(other) => return Err(other),
            }
        }

        let frame = {
            let mut device_guard = self.device.lock().unwrap();
            match device_guard.acquire_frame() {
                Ok(frame) => frame,
                Err(Error::SwapchainLost) => {
                    let (width, height) = device_guard.swapchain_extent();
                    drop(device_guard);
                    crate::engine_warn!("radiant::Renderer", "swapchain lost on acquire");
                    self.resize(width, height)?;
                    return Ok(());
                }
                Err(other) => return Err(other),
            }
        };

        self.update_camera_uniform(scene, frame.frame_index)?;

        // ----- compute: GI chain -----
        let mut gi_dispatched = false;
        {
            let mut list = frame.compute_list.lock().unwrap();
            list.begin()?;
            if let Some(tlas) = scene.tlas() {
                let tlas_guard = tlas.lock().unwrap();
                gi_dispatched = self.cascades.record(
                    &mut *list,
                    &*tlas_guard,
                    scene.skybox_index(),
                    scene.active_lights().len() as u32,
                )?;
            }
            list.end()?;
        }

        // ----- graphics: G-buffer + outline -----
        let mut draw_calls = 0;
        {
            let mut list = frame.graphics_list.lock().unwrap();
            list.begin()?;

            if let Some(camera) = scene.main_camera() {
                let camera = camera.clone();
                let draws = scene.draw_items();
                let selected = scene.selection().current();

                draw_calls = self.gbuffer.record(
                    &mut *list,
                    frame.frame_index,
                    &camera,
                    &draws,
                    selected,
                )?;

                let selected_item = selected
                    .and_then(|entity| draws.iter().find(|item| item.entity == entity));
                self.outline.record(
                    &mut *list,
                    self.gbuffer.extent(),
                    selected_item,
                    self.gbuffer.depth_stencil_texture(frame.frame_index).as_ref(),
                    self.camera_buffers[frame.frame_index as usize].bindless_index(),
                )?;
            }

            list.end()?;
        }

        // Submit compute then graphics, present.
        let submit_result = self.device.lock().unwrap().submit_frame(frame);
        match submit_result {
            Ok(()) => {}
            Err(Error::SwapchainLost) => {
                let (width, height) = self.device.lock().unwrap().swapchain_extent();
                crate::engine_warn!("radiant::Renderer", "swapchain lost on present");
                self.resize(width, height)?;
                return Ok(());
            }
            Err(other) => return Err(other),
        }

        self.stats = RenderStats {
            draw_calls,
            gi_dispatched,
            frames: self.stats.frames + 1,
        };
        Ok(())
    }

    /// Refresh this frame's camera UBO slice from the main camera.
    fn update_camera_uniform(&self, scene: &Scene, frame_index: u32) -> Result<()> {
        let Some(camera) = scene.main_camera() else {
            return Ok(());
        };

        let view = *camera.view_matrix();
        let position = view.inverse().col(3);
        let uniform = CameraUniform {
            view: view.to_cols_array(),
            projection: camera.projection_matrix().to_cols_array(),
            view_projection: camera.view_projection_matrix().to_cols_array(),
            position: position.to_array(),
        };
        self.camera_buffers[frame_index as usize].update(0, bytemuck::bytes_of(&uniform))
    }

    /// Camera UBO bindless index for the current frame, used by passes
    /// that read camera data through the bindless array.
    pub fn camera_ubo_index(&self, frame_index: u32) -> BindlessIndex {
        self.camera_buffers[frame_index as usize].bindless_index()
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
