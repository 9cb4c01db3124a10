/// VulkanGraphicsDevice - the backend entry point.
///
/// Owns the context, swapchain, bindless table, shared set layouts,
/// and the per-frame resources (fence, semaphores, one compute and
/// one graphics command list each). Frames in flight equal the
/// swapchain image count; each frame's resources are recycled behind
/// its fence.

use std::sync::{Arc, Mutex};
use ash::vk;
use winit::window::Window;
use radiant_engine::bindless::ResourceClass;
use radiant_engine::error::{Error, Result};
use radiant_engine::{engine_err, engine_info};
use radiant_engine::graphics_device::{
    BindingGroup as CoreBindingGroup, BindingResource, Blas as CoreBlas, BlasDesc,
    Buffer as CoreBuffer, BufferDesc, BufferUsage, ComputePipeline as CoreComputePipeline,
    ComputePipelineDesc, DeviceCaps, DeviceConfig, DeviceStats, FrameContext, GraphicsDevice,
    GraphicsPipeline as CoreGraphicsPipeline, GraphicsPipelineDesc, PipelineRef,
    Shader as CoreShader, ShaderDesc, Texture as CoreTexture, TextureDesc, TextureFormat,
    TextureUsage, Tlas as CoreTlas,
};
use crate::vulkan_accel::{AccelShared, Blas, Tlas};
use crate::vulkan_bindless::BindlessTable;
use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::{CommandList, SwapchainTarget};
use crate::vulkan_context::VulkanContext;
use crate::vulkan_pipeline::{
    ComputePipeline, GraphicsPipeline, SetLayouts, SET_MATERIAL, SET_TRANSIENT,
};
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::Texture;

/// Per-frame synchronization and command lists.
struct FrameResources {
    fence: vk::Fence,
    image_available: vk::Semaphore,
    compute_done: vk::Semaphore,
    render_done: vk::Semaphore,
    compute_list: Arc<Mutex<CommandList>>,
    graphics_list: Arc<Mutex<CommandList>>,
    /// Tiny buffer transitioning the swapchain image to PRESENT
    present_pool: vk::CommandPool,
    present_buffer: vk::CommandBuffer,
}

pub struct VulkanGraphicsDevice {
    swapchain: Swapchain,
    bindless: Arc<BindlessTable>,
    set_layouts: SetLayouts,
    /// Pool for material/transient descriptor sets
    descriptor_pool: Arc<Mutex<vk::DescriptorPool>>,
    frames: Vec<FrameResources>,
    frame_counter: u64,
    stats: DeviceStats,
    /// Declared last: every other field's teardown still needs the
    /// device alive.
    context: VulkanContext,
}

impl VulkanGraphicsDevice {
    pub fn new(window: &Window, config: DeviceConfig) -> Result<Self> {
        let context = VulkanContext::new(window, &config)?;
        let size = window.inner_size();
        let swapchain = Swapchain::new(&context, size.width.max(1), size.height.max(1))?;

        let frames_in_flight = swapchain.images.len() as u32;
        let bindless = Arc::new(BindlessTable::new(context.device.clone(), frames_in_flight)?);
        let set_layouts = SetLayouts::new(&context.device)?;

        let descriptor_pool = unsafe {
            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: 4096,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: 1024,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::STORAGE_IMAGE,
                    descriptor_count: 256,
                },
            ];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
                .max_sets(2048)
                .pool_sizes(&pool_sizes);
            context
                .device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create descriptor pool: {:?}", e)
                })?
        };

        let mut frames = Vec::with_capacity(frames_in_flight as usize);
        for _ in 0..frames_in_flight {
            frames.push(Self::create_frame_resources(&context, &bindless)?);
        }

        engine_info!(
            "radiant::vulkan",
            "device initialized with {} frames in flight",
            frames_in_flight
        );

        Ok(Self {
            context,
            swapchain,
            bindless,
            set_layouts,
            descriptor_pool: Arc::new(Mutex::new(descriptor_pool)),
            frames,
            frame_counter: 0,
            stats: DeviceStats::default(),
        })
    }

    fn create_frame_resources(
        context: &VulkanContext,
        bindless: &Arc<BindlessTable>,
    ) -> Result<FrameResources> {
        unsafe {
            let fence = context
                .device
                .create_fence(
                    &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
                    None,
                )
                .map_err(|e| engine_err!("radiant::vulkan", "Fence creation failed: {:?}", e))?;

            let semaphore = |device: &ash::Device| -> Result<vk::Semaphore> {
                device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| {
                        engine_err!("radiant::vulkan", "Semaphore creation failed: {:?}", e)
                    })
            };

            let present_pool = context
                .device
                .create_command_pool(
                    &vk::CommandPoolCreateInfo::default()
                        .queue_family_index(context.queue_families.graphics)
                        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER),
                    None,
                )
                .map_err(|e| engine_err!("radiant::vulkan", "Pool creation failed: {:?}", e))?;
            let present_buffer = context
                .device
                .allocate_command_buffers(
                    &vk::CommandBufferAllocateInfo::default()
                        .command_pool(present_pool)
                        .level(vk::CommandBufferLevel::PRIMARY)
                        .command_buffer_count(1),
                )
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Buffer allocation failed: {:?}", e)
                })?[0];

            Ok(FrameResources {
                fence,
                image_available: semaphore(&context.device)?,
                compute_done: semaphore(&context.device)?,
                render_done: semaphore(&context.device)?,
                compute_list: Arc::new(Mutex::new(CommandList::new(
                    context.device.clone(),
                    context.vertex_input_loader.clone(),
                    context.queue_families.compute,
                    bindless.set(),
                )?)),
                graphics_list: Arc::new(Mutex::new(CommandList::new(
                    context.device.clone(),
                    context.vertex_input_loader.clone(),
                    context.queue_families.graphics,
                    bindless.set(),
                )?)),
                present_pool,
                present_buffer,
            })
        }
    }

    /// Record the transition of this frame's swapchain image into
    /// PRESENT_SRC. `was_rendered` picks the source layout.
    unsafe fn record_present_transition(
        &self,
        frame: &FrameResources,
        image: vk::Image,
        was_rendered: bool,
    ) -> Result<()> {
        let device = &self.context.device;
        device
            .reset_command_buffer(frame.present_buffer, vk::CommandBufferResetFlags::empty())
            .map_err(|e| engine_err!("radiant::vulkan", "reset failed: {:?}", e))?;
        device
            .begin_command_buffer(
                frame.present_buffer,
                &vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
            )
            .map_err(|e| engine_err!("radiant::vulkan", "begin failed: {:?}", e))?;

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(if was_rendered {
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
            } else {
                vk::ImageLayout::UNDEFINED
            })
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_access_mask(vk::AccessFlags::empty())
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );
        device.cmd_pipeline_barrier(
            frame.present_buffer,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );

        device
            .end_command_buffer(frame.present_buffer)
            .map_err(|e| engine_err!("radiant::vulkan", "end failed: {:?}", e))?;
        Ok(())
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn caps(&self) -> DeviceCaps {
        DeviceCaps {
            ray_tracing: true,
            tlas_refit: true,
            dedicated_compute_queue: self.context.queue_families.dedicated_compute(),
        }
    }

    fn frames_in_flight(&self) -> u32 {
        self.frames.len() as u32
    }

    fn swapchain_extent(&self) -> (u32, u32) {
        (self.swapchain.extent.width, self.swapchain.extent.height)
    }

    fn swapchain_format(&self) -> TextureFormat {
        match self.swapchain.format {
            vk::Format::R8G8B8A8_UNORM => TextureFormat::Rgba8Unorm,
            vk::Format::R8G8B8A8_SRGB => TextureFormat::Rgba8Srgb,
            _ => TextureFormat::Bgra8Unorm,
        }
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn CoreTexture>> {
        let mut registry = self.bindless.registry.lock().unwrap();
        let bindless = if desc.usage.contains(TextureUsage::SAMPLED) {
            registry.allocate(ResourceClass::SampledTexture)?
        } else {
            radiant_engine::bindless::BindlessIndex::NULL
        };
        let storage = if desc.usage.contains(TextureUsage::STORAGE) {
            registry.allocate(ResourceClass::StorageImage)?
        } else {
            radiant_engine::bindless::BindlessIndex::NULL
        };
        drop(registry);

        let texture = Texture::new(
            self.context.device.clone(),
            self.context.allocator.clone(),
            desc,
            bindless,
            storage,
            self.bindless.clone(),
        )?;

        self.bindless.write_sampled_texture(bindless, texture.raw_view());
        self.bindless.write_storage_image(storage, texture.raw_view());

        Ok(Arc::new(texture))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn CoreBuffer>> {
        let bindless = if desc.usage == BufferUsage::Uniform {
            self.bindless
                .registry
                .lock()
                .unwrap()
                .allocate(ResourceClass::UniformBuffer)?
        } else {
            radiant_engine::bindless::BindlessIndex::NULL
        };

        let buffer = Buffer::new(
            self.context.device.clone(),
            self.context.allocator.clone(),
            desc,
            bindless,
            self.bindless.clone(),
        )?;
        self.bindless
            .write_uniform_buffer(bindless, buffer.raw(), buffer.desc().size);

        Ok(Arc::new(buffer))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn CoreShader>> {
        Ok(Arc::new(Shader::new(self.context.device.clone(), desc)?))
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: GraphicsPipelineDesc,
    ) -> Result<Arc<dyn CoreGraphicsPipeline>> {
        Ok(Arc::new(GraphicsPipeline::new(
            self.context.device.clone(),
            self.bindless.layout(),
            &self.set_layouts,
            desc,
        )?))
    }

    fn create_compute_pipeline(
        &mut self,
        desc: ComputePipelineDesc,
    ) -> Result<Arc<dyn CoreComputePipeline>> {
        Ok(Arc::new(ComputePipeline::new(
            self.context.device.clone(),
            self.bindless.layout(),
            &self.set_layouts,
            desc,
        )?))
    }

    fn create_binding_group(
        &mut self,
        _pipeline: PipelineRef,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn CoreBindingGroup>> {
        let layout = match set_index {
            SET_MATERIAL => self.set_layouts.material,
            SET_TRANSIENT => self.set_layouts.transient,
            other => {
                return Err(Error::Precondition(format!(
                    "binding groups only exist for sets {} and {}, got {}",
                    SET_MATERIAL, SET_TRANSIENT, other
                )))
            }
        };

        Ok(Arc::new(BindingGroup::new(
            self.context.device.clone(),
            self.descriptor_pool.clone(),
            layout,
            set_index,
            self.bindless.default_sampler(),
            resources,
        )?))
    }

    fn create_blas(&mut self, desc: BlasDesc) -> Result<Arc<dyn CoreBlas>> {
        Ok(Arc::new(Blas::new(
            AccelShared::from_context(&self.context),
            desc,
        )?))
    }

    fn create_tlas(&mut self) -> Result<Arc<Mutex<dyn CoreTlas>>> {
        Ok(Arc::new(Mutex::new(Tlas::new(
            AccelShared::from_context(&self.context),
            self.bindless.clone(),
        )?)))
    }

    fn acquire_frame(&mut self) -> Result<FrameContext> {
        let frame_index = (self.frame_counter % self.frames.len() as u64) as u32;
        let frame = &self.frames[frame_index as usize];

        unsafe {
            self.context
                .device
                .wait_for_fences(&[frame.fence], true, u64::MAX)
                .map_err(|e| engine_err!("radiant::vulkan", "Fence wait failed: {:?}", e))?;
        }

        let image_index = self.swapchain.acquire(frame.image_available)?;

        unsafe {
            self.context
                .device
                .reset_fences(&[frame.fence])
                .map_err(|e| engine_err!("radiant::vulkan", "Fence reset failed: {:?}", e))?;
        }

        // The fence signalled: this frame slot's previous work is done
        // and its freed bindless slots can recycle.
        self.bindless.registry.lock().unwrap().begin_frame();
        self.frame_counter += 1;

        frame
            .graphics_list
            .lock()
            .unwrap()
            .set_swapchain_target(SwapchainTarget {
                image: self.swapchain.images[image_index as usize],
                view: self.swapchain.views[image_index as usize],
                extent: self.swapchain.extent,
            });

        Ok(FrameContext {
            frame_index,
            image_index,
            compute_list: frame.compute_list.clone(),
            graphics_list: frame.graphics_list.clone(),
        })
    }

    fn submit_frame(&mut self, frame: FrameContext) -> Result<()> {
        let resources = &self.frames[frame.frame_index as usize];
        let image = self.swapchain.images[frame.image_index as usize];

        let (compute_buffer, graphics_buffer, was_rendered) = {
            let compute_list = resources.compute_list.lock().unwrap();
            let graphics_list = resources.graphics_list.lock().unwrap();
            (
                compute_list.raw(),
                graphics_list.raw(),
                graphics_list.used_swapchain,
            )
        };

        unsafe {
            self.record_present_transition(resources, image, was_rendered)?;

            // Compute first; graphics waits for it and for the image.
            let compute_buffers = [compute_buffer];
            let compute_signals = [resources.compute_done];
            let compute_submit = vk::SubmitInfo::default()
                .command_buffers(&compute_buffers)
                .signal_semaphores(&compute_signals);
            self.context
                .device
                .queue_submit(self.context.compute_queue, &[compute_submit], vk::Fence::null())
                .map_err(|e| engine_err!("radiant::vulkan", "Compute submit failed: {:?}", e))?;

            let graphics_buffers = [graphics_buffer, resources.present_buffer];
            let wait_semaphores = [resources.image_available, resources.compute_done];
            let wait_stages = [
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::FRAGMENT_SHADER
                    | vk::PipelineStageFlags::COMPUTE_SHADER,
            ];
            let render_signals = [resources.render_done];
            let graphics_submit = vk::SubmitInfo::default()
                .command_buffers(&graphics_buffers)
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .signal_semaphores(&render_signals);
            self.context
                .device
                .queue_submit(
                    self.context.graphics_queue,
                    &[graphics_submit],
                    resources.fence,
                )
                .map_err(|e| engine_err!("radiant::vulkan", "Graphics submit failed: {:?}", e))?;
        }

        self.swapchain.present(
            self.context.graphics_queue,
            resources.render_done,
            frame.image_index,
        )
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.context
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("radiant::vulkan", "wait_idle failed: {:?}", e))
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.swapchain.recreate(&self.context, width, height)
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.context.device.device_wait_idle();
            for frame in &self.frames {
                self.context.device.destroy_fence(frame.fence, None);
                self.context
                    .device
                    .destroy_semaphore(frame.image_available, None);
                self.context.device.destroy_semaphore(frame.compute_done, None);
                self.context.device.destroy_semaphore(frame.render_done, None);
                self.context
                    .device
                    .destroy_command_pool(frame.present_pool, None);
            }
            let pool = self.descriptor_pool.lock().unwrap();
            self.context.device.destroy_descriptor_pool(*pool, None);
            self.set_layouts.destroy(&self.context.device);
            self.bindless.destroy();
        }
    }
}
