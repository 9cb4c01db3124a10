/// MockGraphicsDevice — recording device for GPU-free tests.
///
/// Every command-list call is appended to a shared command log that
/// tests inspect: dispatch sizes, barrier layouts, push-constant
/// bytes, stencil state, draw counts. Resources are plain structs
/// whose bindless indices come from a real `BindlessRegistry`, so slot
/// lifetime behaviour matches production.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use glam::Mat4;
use crate::bindless::{BindlessIndex, BindlessRegistry, ResourceClass};
use crate::error::{Error, Result};
use super::*;

// ===== COMMAND LOG =====

/// One recorded command. Only the fields tests assert on are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Begin,
    End,
    ImageBarrier {
        texture: String,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    },
    CopyTexture {
        src: String,
        dst: String,
    },
    BindComputePipeline(String),
    BindBindingGroup {
        set_index: u32,
    },
    PushConstants {
        stages: ShaderStageFlags,
        data: Vec<u8>,
    },
    Dispatch {
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    },
    BeginRendering {
        extent: (u32, u32),
        color_targets: Vec<String>,
        color_load_ops: Vec<LoadOp>,
        has_depth_stencil: bool,
    },
    EndRendering,
    BindGraphicsPipeline(String),
    SetViewport,
    SetScissor,
    SetStencilReference(u32),
    SetStencilWriteMask(u32),
    SetVertexLayout,
    BindVertexBuffer(String),
    BindIndexBuffer(String),
    DrawIndexed {
        index_count: u32,
    },
}

/// Shared, clonable command log.
pub type CommandLog = Arc<Mutex<Vec<MockCommand>>>;

// ===== RESOURCES =====

pub struct MockTexture {
    desc: TextureDesc,
    bindless: BindlessIndex,
    storage: BindlessIndex,
}

impl Texture for MockTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }
    fn bindless_index(&self) -> BindlessIndex {
        self.bindless
    }
    fn storage_index(&self) -> BindlessIndex {
        self.storage
    }
}

pub struct MockBuffer {
    desc: BufferDesc,
    bindless: BindlessIndex,
    /// Last bytes written through `update`
    pub contents: Mutex<Vec<u8>>,
}

impl Buffer for MockBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut contents = self.contents.lock().unwrap();
        let end = offset as usize + data.len();
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn bindless_index(&self) -> BindlessIndex {
        self.bindless
    }
}

pub struct MockShader {
    desc: ShaderDesc,
}

impl MockShader {
    /// A placeholder shader for tests (no real SPIR-V).
    pub fn new(name: &str) -> Arc<dyn Shader> {
        Arc::new(Self {
            desc: ShaderDesc {
                name: name.to_string(),
                spirv: Vec::new(),
                entry_point: "main".to_string(),
            },
        })
    }
}

impl Shader for MockShader {
    fn desc(&self) -> &ShaderDesc {
        &self.desc
    }
}

pub struct MockGraphicsPipeline {
    name: String,
}

impl GraphicsPipeline for MockGraphicsPipeline {
    fn name(&self) -> &str {
        &self.name
    }
}

pub struct MockComputePipeline {
    name: String,
}

impl ComputePipeline for MockComputePipeline {
    fn name(&self) -> &str {
        &self.name
    }
}

pub struct MockBindingGroup {
    set_index: u32,
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

pub struct MockBlas {
    name: String,
    triangle_count: u32,
}

impl Blas for MockBlas {
    fn name(&self) -> &str {
        &self.name
    }
    fn triangle_count(&self) -> u32 {
        self.triangle_count
    }
}

pub struct MockTlas {
    instances: Vec<TlasInstance>,
    built: bool,
    bindless: BindlessIndex,
    /// Number of `build` calls, for rebuild-vs-refit assertions
    pub build_count: u32,
    /// Number of `update_instances` calls
    pub update_count: u32,
}

impl Tlas for MockTlas {
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
        self.update_count += 1;
        Ok(())
    }

    fn build(&mut self) -> Result<()> {
        if self.instances.is_empty() {
            return Err(Error::Build("TLAS build with no instances".to_string()));
        }
        self.built = true;
        self.build_count += 1;
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

// ===== COMMAND LIST =====

pub struct MockCommandList {
    log: CommandLog,
    recording: bool,
    in_rendering: bool,
}

impl MockCommandList {
    fn attachment_name(target: &AttachmentTarget) -> String {
        match target {
            AttachmentTarget::Texture(texture) => texture.desc().name.clone(),
            AttachmentTarget::Swapchain => "swapchain".to_string(),
        }
    }

    fn record(&mut self, command: MockCommand) -> Result<()> {
        if !self.recording {
            return Err(Error::Precondition(
                "command list not recording".to_string(),
            ));
        }
        self.log.lock().unwrap().push(command);
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            return Err(Error::Precondition("already recording".to_string()));
        }
        self.recording = true;
        self.log.lock().unwrap().push(MockCommand::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::Precondition("not recording".to_string()));
        }
        if self.in_rendering {
            return Err(Error::Precondition(
                "rendering scope still open".to_string(),
            ));
        }
        self.log.lock().unwrap().push(MockCommand::End);
        self.recording = false;
        Ok(())
    }

    fn image_barrier(&mut self, texture: &dyn Texture, transition: ImageTransition) -> Result<()> {
        self.record(MockCommand::ImageBarrier {
            texture: texture.desc().name.clone(),
            old_layout: transition.old_layout,
            new_layout: transition.new_layout,
        })
    }

    fn copy_texture(&mut self, src: &dyn Texture, dst: &dyn Texture) -> Result<()> {
        self.record(MockCommand::CopyTexture {
            src: src.desc().name.clone(),
            dst: dst.desc().name.clone(),
        })
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipeline) -> Result<()> {
        self.record(MockCommand::BindComputePipeline(pipeline.name().to_string()))
    }

    fn bind_binding_group(&mut self, group: &dyn BindingGroup) -> Result<()> {
        self.record(MockCommand::BindBindingGroup {
            set_index: group.set_index(),
        })
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, data: &[u8]) -> Result<()> {
        self.record(MockCommand::PushConstants {
            stages,
            data: data.to_vec(),
        })
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()> {
        self.record(MockCommand::Dispatch {
            groups_x,
            groups_y,
            groups_z,
        })
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        let command = MockCommand::BeginRendering {
            extent: info.extent,
            color_targets: info
                .color_attachments
                .iter()
                .map(|a| Self::attachment_name(&a.target))
                .collect(),
            color_load_ops: info.color_attachments.iter().map(|a| a.load_op).collect(),
            has_depth_stencil: info.depth_stencil_attachment.is_some(),
        };
        self.record(command)?;
        self.in_rendering = true;
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        if !self.in_rendering {
            return Err(Error::Precondition("no rendering scope open".to_string()));
        }
        self.in_rendering = false;
        self.record(MockCommand::EndRendering)
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn GraphicsPipeline) -> Result<()> {
        self.record(MockCommand::BindGraphicsPipeline(
            pipeline.name().to_string(),
        ))
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.record(MockCommand::SetViewport)
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.record(MockCommand::SetScissor)
    }

    fn set_stencil_reference(&mut self, reference: u32) -> Result<()> {
        self.record(MockCommand::SetStencilReference(reference))
    }

    fn set_stencil_write_mask(&mut self, mask: u32) -> Result<()> {
        self.record(MockCommand::SetStencilWriteMask(mask))
    }

    fn set_vertex_layout(&mut self, _layout: &VertexLayout) -> Result<()> {
        self.record(MockCommand::SetVertexLayout)
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer) -> Result<()> {
        self.record(MockCommand::BindVertexBuffer(buffer.desc().name.clone()))
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, _index_type: IndexType) -> Result<()> {
        self.record(MockCommand::BindIndexBuffer(buffer.desc().name.clone()))
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record(MockCommand::DrawIndexed { index_count })
    }
}

// ===== DEVICE =====

/// Recording device. Frame acquire can be forced to fail to test the
/// swapchain-loss path.
pub struct MockGraphicsDevice {
    registry: BindlessRegistry,
    extent: (u32, u32),
    frames_in_flight: u32,
    frame_counter: u32,
    compute_log: CommandLog,
    graphics_log: CommandLog,
    fail_next_acquire: Arc<AtomicBool>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::with_extent(1280, 720)
    }

    pub fn with_extent(width: u32, height: u32) -> Self {
        Self {
            registry: BindlessRegistry::new(2),
            extent: (width, height),
            frames_in_flight: 2,
            frame_counter: 0,
            compute_log: Arc::new(Mutex::new(Vec::new())),
            graphics_log: Arc::new(Mutex::new(Vec::new())),
            fail_next_acquire: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Commands recorded on the compute list so far.
    pub fn compute_commands(&self) -> Vec<MockCommand> {
        self.compute_log.lock().unwrap().clone()
    }

    /// Commands recorded on the graphics list so far.
    pub fn graphics_commands(&self) -> Vec<MockCommand> {
        self.graphics_log.lock().unwrap().clone()
    }

    /// Drop all recorded commands.
    pub fn clear_commands(&self) {
        self.compute_log.lock().unwrap().clear();
        self.graphics_log.lock().unwrap().clear();
    }

    /// Make the next `acquire_frame` fail with `SwapchainLost`.
    pub fn fail_next_acquire(&self) {
        self.fail_next_acquire.store(true, Ordering::SeqCst);
    }

    /// A standalone command list with its own log (pass unit tests).
    pub fn standalone_list() -> (Arc<Mutex<dyn CommandList>>, CommandLog) {
        let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
        let list = Arc::new(Mutex::new(MockCommandList {
            log: log.clone(),
            recording: false,
            in_rendering: false,
        }));
        (list, log)
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn caps(&self) -> DeviceCaps {
        DeviceCaps {
            ray_tracing: true,
            tlas_refit: true,
            dedicated_compute_queue: false,
        }
    }

    fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    fn swapchain_extent(&self) -> (u32, u32) {
        self.extent
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        let bindless = if desc.usage.contains(TextureUsage::SAMPLED) {
            self.registry.allocate(ResourceClass::SampledTexture)?
        } else {
            BindlessIndex::NULL
        };
        let storage = if desc.usage.contains(TextureUsage::STORAGE) {
            self.registry.allocate(ResourceClass::StorageImage)?
        } else {
            BindlessIndex::NULL
        };
        Ok(Arc::new(MockTexture {
            desc,
            bindless,
            storage,
        }))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        let bindless = if desc.usage == BufferUsage::Uniform {
            self.registry.allocate(ResourceClass::UniformBuffer)?
        } else {
            BindlessIndex::NULL
        };
        Ok(Arc::new(MockBuffer {
            desc,
            bindless,
            contents: Mutex::new(Vec::new()),
        }))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(MockShader { desc }))
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: GraphicsPipelineDesc,
    ) -> Result<Arc<dyn GraphicsPipeline>> {
        Ok(Arc::new(MockGraphicsPipeline { name: desc.name }))
    }

    fn create_compute_pipeline(
        &mut self,
        desc: ComputePipelineDesc,
    ) -> Result<Arc<dyn ComputePipeline>> {
        Ok(Arc::new(MockComputePipeline { name: desc.name }))
    }

    fn create_binding_group(
        &mut self,
        _pipeline: PipelineRef,
        set_index: u32,
        _resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        Ok(Arc::new(MockBindingGroup { set_index }))
    }

    fn create_blas(&mut self, desc: BlasDesc) -> Result<Arc<dyn Blas>> {
        if desc.index_count % 3 != 0 {
            return Err(Error::Build(format!(
                "BLAS '{}': index count {} is not a multiple of 3",
                desc.name, desc.index_count
            )));
        }
        if desc.vertex_stride < 12 {
            return Err(Error::Build(format!(
                "BLAS '{}': vertex stride {} cannot hold a position",
                desc.name, desc.vertex_stride
            )));
        }
        Ok(Arc::new(MockBlas {
            name: desc.name,
            triangle_count: desc.index_count / 3,
        }))
    }

    fn create_tlas(&mut self) -> Result<Arc<Mutex<dyn Tlas>>> {
        let bindless = self.registry.allocate(ResourceClass::AccelerationStructure)?;
        Ok(Arc::new(Mutex::new(MockTlas {
            instances: Vec::new(),
            built: false,
            bindless,
            build_count: 0,
            update_count: 0,
        })))
    }

    fn acquire_frame(&mut self) -> Result<FrameContext> {
        if self.fail_next_acquire.swap(false, Ordering::SeqCst) {
            return Err(Error::SwapchainLost);
        }
        self.registry.begin_frame();
        let frame_index = self.frame_counter % self.frames_in_flight;
        self.frame_counter += 1;

        Ok(FrameContext {
            frame_index,
            image_index: frame_index,
            compute_list: Arc::new(Mutex::new(MockCommandList {
                log: self.compute_log.clone(),
                recording: false,
                in_rendering: false,
            })),
            graphics_list: Arc::new(Mutex::new(MockCommandList {
                log: self.graphics_log.clone(),
                recording: false,
                in_rendering: false,
            })),
        })
    }

    fn submit_frame(&mut self, _frame: FrameContext) -> Result<()> {
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.extent = (width, height);
        Ok(())
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats::default()
    }
}
