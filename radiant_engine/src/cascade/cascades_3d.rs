/// RadianceCascades3D — the volumetric cascade engine.
///
/// Radiance lives in 2D-array textures: probe (px, py, pz) owns the
/// q x q tile at (px*q, pz*q) on layer py. Per frame the tracer
/// rewrites every level against the TLAS and the merger folds coarser
/// levels into finer ones. There is no dedicated irradiance texture in
/// 3D: shading integrates cascade 0 in-shader with the same angular
/// contract (`angular::integrate_probe_3d`).
///
/// Each level also keeps a flattened 2D sibling (array layers stacked
/// vertically) for presentation and debug views, refreshed by GPU copy
/// after tracing and again after merging.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};
use crate::bindless::BindlessIndex;
use crate::error::Result;
use crate::graphics_device::{
    Access, BindingResource, Buffer, BufferDesc, BufferUsage, CommandList, ComputePipeline,
    ComputePipelineDesc, GraphicsDevice, ImageLayout, ImageTransition, PipelineRef,
    PushConstantRange, Shader, ShaderStageFlags, Texture, TextureDesc, TextureFilter,
    TextureFormat, TextureKind, TextureUsage, Tlas, BindingGroup,
};
use super::config::CascadeConfig3D;
use super::level::{derive_levels_3d, CascadeLevel3D};

/// Work-group tile edge; dispatches are 8 x 8 x 1 per array layer.
const WORK_GROUP_SIZE: u32 = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TracePushConstants {
    cascade_index: u32,
    cascade_levels: u32,
    tlas_index: u32,
    skybox_texture_index: u32,
    light_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MergePushConstants {
    prev_cascade_index: u32,
    current_cascade_index: u32,
}

/// The two compute shaders of the 3D pipeline.
pub struct CascadeShaders3D {
    pub probe_trace: Arc<dyn Shader>,
    pub cascade_merge: Arc<dyn Shader>,
}

pub struct RadianceCascades3D {
    levels: Vec<CascadeLevel3D>,
    textures: Vec<Arc<dyn Texture>>,
    /// Flattened presentation siblings, refreshed after tracing
    flat_textures: Vec<Arc<dyn Texture>>,
    /// Flattened siblings refreshed after merging
    flat_merged_textures: Vec<Arc<dyn Texture>>,
    uniform_buffers: Vec<Arc<dyn Buffer>>,
    trace_pipeline: Arc<dyn ComputePipeline>,
    merge_pipeline: Arc<dyn ComputePipeline>,
    level_binding_groups: Vec<Arc<dyn BindingGroup>>,
}

impl RadianceCascades3D {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        config: CascadeConfig3D,
        shaders: CascadeShaders3D,
    ) -> Result<Self> {
        config.validate()?;
        let mut levels = derive_levels_3d(&config);

        let trace_pipeline = device.create_compute_pipeline(ComputePipelineDesc {
            name: "rc3d_probe_trace".to_string(),
            shader: shaders.probe_trace,
            push_constants: vec![PushConstantRange {
                stages: ShaderStageFlags::COMPUTE,
                size: std::mem::size_of::<TracePushConstants>() as u32,
            }],
        })?;
        let merge_pipeline = device.create_compute_pipeline(ComputePipelineDesc {
            name: "rc3d_cascade_merge".to_string(),
            shader: shaders.cascade_merge,
            push_constants: vec![PushConstantRange {
                stages: ShaderStageFlags::COMPUTE,
                size: std::mem::size_of::<MergePushConstants>() as u32,
            }],
        })?;

        let mut textures: Vec<Arc<dyn Texture>> = Vec::with_capacity(levels.len());
        let mut flat_textures = Vec::with_capacity(levels.len());
        let mut flat_merged_textures = Vec::with_capacity(levels.len());

        for level in &mut levels {
            let (width, height, layers) = level.texture_extent();
            let texture = device.create_texture(TextureDesc {
                name: format!("[RC] Cascade Texture: {}", level.cascade_level),
                width,
                height,
                depth: layers,
                format: TextureFormat::Rgba32Float,
                kind: TextureKind::D2Array,
                usage: TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::TRANSFER_SRC,
                filter: TextureFilter::Nearest,
            })?;
            level.cascade_texture_index = texture.bindless_index().get();

            // Debug siblings: layers stacked vertically into one 2D image.
            let flat_desc = |name: String| TextureDesc {
                name,
                width,
                height: height * layers,
                depth: 1,
                format: TextureFormat::Rgba32Float,
                kind: TextureKind::D2,
                usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
                filter: TextureFilter::Nearest,
            };
            flat_textures.push(device.create_texture(flat_desc(format!(
                "[RC] Flattened Cascade Texture: {}",
                level.cascade_level
            )))?);
            flat_merged_textures.push(device.create_texture(flat_desc(format!(
                "[RC] Flattened Merged Cascade Texture: {}",
                level.cascade_level
            )))?);

            textures.push(texture);
        }

        let mut uniform_buffers = Vec::with_capacity(levels.len());
        for level in &levels {
            let buffer = device.create_buffer(BufferDesc {
                name: format!("[RC] Cascade Level Info: {}", level.cascade_level),
                size: std::mem::size_of::<CascadeLevel3D>() as u64,
                usage: BufferUsage::Uniform,
                cpu_visible: true,
            })?;
            buffer.update(0, bytemuck::bytes_of(level))?;
            uniform_buffers.push(buffer);
        }

        let mut level_binding_groups = Vec::with_capacity(levels.len());
        for texture in &textures {
            level_binding_groups.push(device.create_binding_group(
                PipelineRef::Compute(trace_pipeline.as_ref()),
                4,
                &[BindingResource::StorageImage(texture.as_ref())],
            )?);
        }

        for level in &levels {
            crate::engine_info!(
                "radiant::RadianceCascades3D",
                "cascade {}: grid {:?}, spacing {:?}, q {}, interval {} - {}",
                level.cascade_level,
                level.probe_grid_dims,
                level.probe_spacing,
                level.angular_resolution,
                level.min_probe_distance,
                level.max_probe_distance
            );
        }

        Ok(Self {
            levels,
            textures,
            flat_textures,
            flat_merged_textures,
            uniform_buffers,
            trace_pipeline,
            merge_pipeline,
            level_binding_groups,
        })
    }

    // ===== ACCESSORS =====

    pub fn levels(&self) -> &[CascadeLevel3D] {
        &self.levels
    }

    /// Bindless index of cascade 0, consumed by shading.
    pub fn cascade0_index(&self) -> BindlessIndex {
        self.textures[0].bindless_index()
    }

    pub fn flat_texture(&self, cascade_index: u32) -> Option<&Arc<dyn Texture>> {
        self.flat_textures.get(cascade_index as usize)
    }

    pub fn flat_merged_texture(&self, cascade_index: u32) -> Option<&Arc<dyn Texture>> {
        self.flat_merged_textures.get(cascade_index as usize)
    }

    /// Per-level uniform buffers, in cascade order.
    pub fn uniform_buffers(&self) -> &[Arc<dyn Buffer>] {
        &self.uniform_buffers
    }

    /// CPU-computed probe world positions for a level, matching the
    /// shader's centring rule.
    pub fn probe_positions(&self, cascade_index: u32) -> Vec<Vec3> {
        let Some(level) = self.levels.get(cascade_index as usize) else {
            crate::engine_error!(
                "radiant::RadianceCascades3D",
                "invalid cascade index: {}",
                cascade_index
            );
            return Vec::new();
        };

        let dims = UVec3::from(level.probe_grid_dims);
        let mut positions = Vec::with_capacity((dims.x * dims.y * dims.z) as usize);
        for x in 0..dims.x {
            for y in 0..dims.y {
                for z in 0..dims.z {
                    positions.push(level.probe_world_position(UVec3::new(x, y, z)));
                }
            }
        }
        positions
    }

    // ===== RECORDING =====

    /// Record the 3D GI chain: trace, flatten, merge, flatten merged.
    ///
    /// Returns `false` without recording anything when the TLAS is
    /// unbuilt or empty.
    pub fn record(
        &self,
        list: &mut dyn CommandList,
        tlas: &dyn Tlas,
        skybox_texture_index: BindlessIndex,
        light_count: u32,
    ) -> Result<bool> {
        if !tlas.is_built() || tlas.instance_count() == 0 {
            return Ok(false);
        }

        self.record_trace(list, tlas, skybox_texture_index, light_count)?;
        for i in 0..self.levels.len() {
            self.record_flatten(list, i, false)?;
        }
        self.record_merge(list)?;
        for i in 0..self.levels.len() {
            self.record_flatten(list, i, true)?;
        }
        Ok(true)
    }

    fn record_trace(
        &self,
        list: &mut dyn CommandList,
        tlas: &dyn Tlas,
        skybox_texture_index: BindlessIndex,
        light_count: u32,
    ) -> Result<()> {
        for texture in &self.textures {
            list.image_barrier(
                texture.as_ref(),
                ImageTransition {
                    old_layout: ImageLayout::Undefined,
                    new_layout: ImageLayout::General,
                    src_access: Access::NONE,
                    dst_access: Access::SHADER_WRITE,
                },
            )?;
        }

        list.bind_compute_pipeline(self.trace_pipeline.as_ref())?;

        for (i, level) in self.levels.iter().enumerate() {
            list.bind_binding_group(self.level_binding_groups[i].as_ref())?;

            let push = TracePushConstants {
                cascade_index: level.cascade_level,
                cascade_levels: self.levels.len() as u32,
                tlas_index: tlas.bindless_index().get(),
                skybox_texture_index: skybox_texture_index.get(),
                light_count,
            };
            list.push_constants(ShaderStageFlags::COMPUTE, bytemuck::bytes_of(&push))?;

            let (width, height, layers) = level.texture_extent();
            list.dispatch(
                width.div_ceil(WORK_GROUP_SIZE),
                height.div_ceil(WORK_GROUP_SIZE),
                layers,
            )?;
        }

        for texture in &self.textures {
            list.image_barrier(
                texture.as_ref(),
                ImageTransition {
                    old_layout: ImageLayout::General,
                    new_layout: ImageLayout::ShaderReadOnly,
                    src_access: Access::SHADER_WRITE,
                    dst_access: Access::SHADER_READ,
                },
            )?;
        }
        Ok(())
    }

    fn record_merge(&self, list: &mut dyn CommandList) -> Result<()> {
        if self.levels.len() < 2 {
            return Ok(());
        }

        list.bind_compute_pipeline(self.merge_pipeline.as_ref())?;

        for current in (0..self.levels.len() - 1).rev() {
            let texture = self.textures[current].as_ref();

            list.image_barrier(
                texture,
                ImageTransition {
                    old_layout: ImageLayout::ShaderReadOnly,
                    new_layout: ImageLayout::General,
                    src_access: Access::SHADER_READ,
                    dst_access: Access::SHADER_READ | Access::SHADER_WRITE,
                },
            )?;

            list.bind_binding_group(self.level_binding_groups[current].as_ref())?;

            let push = MergePushConstants {
                prev_cascade_index: (current + 1) as u32,
                current_cascade_index: current as u32,
            };
            list.push_constants(ShaderStageFlags::COMPUTE, bytemuck::bytes_of(&push))?;

            let (width, height, layers) = self.levels[current].texture_extent();
            list.dispatch(
                width.div_ceil(WORK_GROUP_SIZE),
                height.div_ceil(WORK_GROUP_SIZE),
                layers,
            )?;

            list.image_barrier(
                texture,
                ImageTransition {
                    old_layout: ImageLayout::General,
                    new_layout: ImageLayout::ShaderReadOnly,
                    src_access: Access::SHADER_WRITE,
                    dst_access: Access::SHADER_READ,
                },
            )?;
        }
        Ok(())
    }

    /// Refresh one level's flattened sibling from the primary texture.
    fn record_flatten(&self, list: &mut dyn CommandList, index: usize, merged: bool) -> Result<()> {
        let src = self.textures[index].as_ref();
        let dst = if merged {
            self.flat_merged_textures[index].as_ref()
        } else {
            self.flat_textures[index].as_ref()
        };

        list.image_barrier(
            src,
            ImageTransition {
                old_layout: ImageLayout::ShaderReadOnly,
                new_layout: ImageLayout::TransferSrc,
                src_access: Access::SHADER_READ,
                dst_access: Access::TRANSFER_READ,
            },
        )?;
        list.image_barrier(
            dst,
            ImageTransition {
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::TransferDst,
                src_access: Access::NONE,
                dst_access: Access::TRANSFER_WRITE,
            },
        )?;

        list.copy_texture(src, dst)?;

        list.image_barrier(
            src,
            ImageTransition {
                old_layout: ImageLayout::TransferSrc,
                new_layout: ImageLayout::ShaderReadOnly,
                src_access: Access::TRANSFER_READ,
                dst_access: Access::SHADER_READ,
            },
        )?;
        list.image_barrier(
            dst,
            ImageTransition {
                old_layout: ImageLayout::TransferDst,
                new_layout: ImageLayout::ShaderReadOnly,
                src_access: Access::TRANSFER_WRITE,
                dst_access: Access::SHADER_READ,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cascades_3d_tests.rs"]
mod tests;
