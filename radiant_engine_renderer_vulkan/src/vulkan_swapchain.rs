/// Swapchain - surface image chain with loss detection.
///
/// Out-of-date and suboptimal results on acquire or present both map
/// to `Error::SwapchainLost`; the device recreates the chain and the
/// renderer drops the frame.

use std::sync::Arc;
use ash::vk;
use radiant_engine::error::{Error, Result};
use radiant_engine::{engine_err, engine_info};
use crate::vulkan_context::VulkanContext;

pub struct Swapchain {
    loader: ash::khr::swapchain::Device,
    device: Arc<ash::Device>,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(context: &VulkanContext, width: u32, height: u32) -> Result<Self> {
        Self::create(context, width, height, vk::SwapchainKHR::null())
    }

    /// Recreate the chain at a new extent, retiring the old one.
    pub fn recreate(&mut self, context: &VulkanContext, width: u32, height: u32) -> Result<()> {
        unsafe {
            context.device.device_wait_idle().ok();
        }
        let new = Self::create(context, width, height, self.swapchain)?;
        // The old chain (passed as old_swapchain above) retires when
        // the replaced value drops.
        let _old = std::mem::replace(self, new);
        engine_info!(
            "radiant::vulkan",
            "swapchain recreated at {}x{}",
            width,
            height
        );
        Ok(())
    }

    fn create(
        context: &VulkanContext,
        width: u32,
        height: u32,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        unsafe {
            let capabilities = context
                .surface_loader
                .get_physical_device_surface_capabilities(
                    context.physical_device,
                    context.surface,
                )
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Surface capabilities query failed: {:?}", e)
                })?;

            let formats = context
                .surface_loader
                .get_physical_device_surface_formats(context.physical_device, context.surface)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Surface formats query failed: {:?}", e)
                })?;
            let surface_format = formats
                .iter()
                .find(|format| {
                    format.format == vk::Format::B8G8R8A8_UNORM
                        && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
                })
                .copied()
                .unwrap_or(formats[0]);

            let extent = if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(
                        capabilities.min_image_extent.width,
                        capabilities.max_image_extent.width,
                    ),
                    height: height.clamp(
                        capabilities.min_image_extent.height,
                        capabilities.max_image_extent.height,
                    ),
                }
            };

            let mut image_count = capabilities.min_image_count + 1;
            if capabilities.max_image_count > 0 {
                image_count = image_count.min(capabilities.max_image_count);
            }

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(context.surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(
                    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
                )
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = context
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create swapchain: {:?}", e)
                })?;

            let images = context
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to get swapchain images: {:?}", e)
                })?;

            let mut views = Vec::with_capacity(images.len());
            for image in &images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(*image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .level_count(1)
                            .layer_count(1),
                    );
                views.push(context.device.create_image_view(&view_info, None).map_err(
                    |e| {
                        engine_err!("radiant::vulkan", "Failed to create swapchain view: {:?}", e)
                    },
                )?);
            }

            Ok(Self {
                loader: context.swapchain_loader.clone(),
                device: context.device.clone(),
                swapchain,
                images,
                views,
                format: surface_format.format,
                extent,
            })
        }
    }

    /// Acquire the next image, signalling `semaphore` when ready.
    pub fn acquire(&self, semaphore: vk::Semaphore) -> Result<u32> {
        unsafe {
            match self.loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            ) {
                Ok((index, suboptimal)) => {
                    if suboptimal {
                        Err(Error::SwapchainLost)
                    } else {
                        Ok(index)
                    }
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainLost),
                Err(e) => Err(engine_err!("radiant::vulkan", "Acquire failed: {:?}", e)),
            }
        }
    }

    /// Present `image_index` after `wait_semaphore` signals.
    pub fn present(
        &self,
        queue: vk::Queue,
        wait_semaphore: vk::Semaphore,
        image_index: u32,
    ) -> Result<()> {
        unsafe {
            let wait_semaphores = [wait_semaphore];
            let swapchains = [self.swapchain];
            let indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&indices);

            match self.loader.queue_present(queue, &present_info) {
                Ok(false) => Ok(()),
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainLost),
                Err(e) => Err(engine_err!("radiant::vulkan", "Present failed: {:?}", e)),
            }
        }
    }

    fn destroy_views(&mut self) {
        unsafe {
            for view in self.views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_views();
        unsafe {
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
