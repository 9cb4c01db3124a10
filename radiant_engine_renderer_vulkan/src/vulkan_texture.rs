/// Texture - Vulkan implementation of the core Texture trait.
///
/// Bindless slots are assigned by the device at creation and written
/// into the global set; they are recycled through the registry's
/// frame-deferred free when the texture drops.

use std::sync::{Arc, Mutex};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use radiant_engine::bindless::BindlessIndex;
use radiant_engine::error::{Error, Result};
use radiant_engine::engine_err;
use radiant_engine::graphics_device::{
    Texture as CoreTexture, TextureDesc, TextureFormat, TextureKind, TextureUsage,
};

/// Translate a core format.
pub fn vk_format(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::Depth24Stencil8 => vk::Format::D24_UNORM_S8_UINT,
    }
}

/// Aspect mask for layout transitions and views.
pub fn vk_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

fn vk_usage(desc: &TextureDesc) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::empty();
    if desc.usage.contains(TextureUsage::SAMPLED) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if desc.usage.contains(TextureUsage::STORAGE) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    if desc.usage.contains(TextureUsage::COLOR_ATTACHMENT) {
        usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if desc.usage.contains(TextureUsage::DEPTH_STENCIL) {
        usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if desc.usage.contains(TextureUsage::TRANSFER_SRC) {
        usage |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if desc.usage.contains(TextureUsage::TRANSFER_DST) {
        usage |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    usage
}

pub struct Texture {
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) allocator: Arc<Mutex<Allocator>>,
    pub(crate) desc: TextureDesc,
    pub(crate) bindless: BindlessIndex,
    pub(crate) storage: BindlessIndex,
    /// Slots return here on drop, quarantined for the in-flight frames
    pub(crate) bindless_table: Arc<crate::vulkan_bindless::BindlessTable>,
}

impl Texture {
    pub fn new(
        device: Arc<ash::Device>,
        allocator: Arc<Mutex<Allocator>>,
        desc: TextureDesc,
        bindless: BindlessIndex,
        storage: BindlessIndex,
        bindless_table: Arc<crate::vulkan_bindless::BindlessTable>,
    ) -> Result<Self> {
        unsafe {
            let (flags, layers) = match desc.kind {
                TextureKind::D2 => (vk::ImageCreateFlags::empty(), 1),
                TextureKind::D2Array => (vk::ImageCreateFlags::empty(), desc.depth.max(1)),
                TextureKind::Cube => (vk::ImageCreateFlags::CUBE_COMPATIBLE, 6),
            };

            let create_info = vk::ImageCreateInfo::default()
                .flags(flags)
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk_format(desc.format))
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(layers)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk_usage(&desc))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device
                .create_image(&create_info, None)
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to create image: {:?}", e))?;

            let requirements = device.get_image_memory_requirements(image);
            let allocation = allocator
                .lock()
                .unwrap()
                .allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    device.destroy_image(image, None);
                    Error::Allocation(format!("texture '{}': {}", desc.name, e))
                })?;

            device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("radiant::vulkan", "Failed to bind image: {:?}", e))?;

            let view_type = match desc.kind {
                TextureKind::D2 => vk::ImageViewType::TYPE_2D,
                TextureKind::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
                TextureKind::Cube => vk::ImageViewType::CUBE,
            };
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(view_type)
                .format(vk_format(desc.format))
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk_aspect(desc.format))
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(layers),
                );

            let view = device.create_image_view(&view_info, None).map_err(|e| {
                engine_err!("radiant::vulkan", "Failed to create image view: {:?}", e)
            })?;

            Ok(Self {
                image,
                view,
                allocation: Some(allocation),
                device,
                allocator,
                desc,
                bindless,
                storage,
                bindless_table,
            })
        }
    }

    pub fn raw_image(&self) -> vk::Image {
        self.image
    }

    pub fn raw_view(&self) -> vk::ImageView {
        self.view
    }

    /// Array layer count (1 for plain 2D textures).
    pub fn layer_count(&self) -> u32 {
        match self.desc.kind {
            TextureKind::D2 => 1,
            TextureKind::D2Array => self.desc.depth.max(1),
            TextureKind::Cube => 6,
        }
    }
}

impl CoreTexture for Texture {
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

impl Drop for Texture {
    fn drop(&mut self) {
        {
            let mut registry = self.bindless_table.registry.lock().unwrap();
            registry.free(
                radiant_engine::bindless::ResourceClass::SampledTexture,
                self.bindless,
            );
            registry.free(
                radiant_engine::bindless::ResourceClass::StorageImage,
                self.storage,
            );
        }
        unsafe {
            self.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                self.allocator.lock().unwrap().free(allocation).ok();
            }
            self.device.destroy_image(self.image, None);
        }
    }
}
