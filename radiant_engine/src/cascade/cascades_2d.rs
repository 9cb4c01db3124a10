/// RadianceCascades2D — the flatland cascade engine.
///
/// Owns per-level radiance textures, the level-0 irradiance texture,
/// the per-level uniform buffers (registered in the bindless UBO
/// array), and the three compute pipelines. Each frame it records,
/// in order: probe trace, coarse-to-fine merge, irradiance
/// integration. The tracer is skipped entirely while the TLAS is
/// unbuilt or empty; the irradiance texture then keeps the previous
/// frame's data.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2};
use crate::bindless::BindlessIndex;
use crate::error::Result;
use crate::graphics_device::{
    Access, BindingResource, Buffer, BufferDesc, BufferUsage, CommandList, ComputePipeline,
    ComputePipelineDesc, GraphicsDevice, ImageLayout, ImageTransition, PipelineRef,
    PushConstantRange, Shader, ShaderStageFlags, Texture, TextureDesc, TextureFilter,
    TextureFormat, TextureKind, TextureUsage, Tlas, BindingGroup,
};
use super::config::CascadeConfig2D;
use super::level::{derive_levels_2d, CascadeLevel2D};

/// Work-group tile edge of every cascade compute shader.
const WORK_GROUP_SIZE: u32 = 8;

/// Per-dispatch constants of the probe trace pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TracePushConstants {
    cascade_index: u32,
    cascade_levels: u32,
    tlas_index: u32,
    skybox_texture_index: u32,
    light_count: u32,
}

/// Per-dispatch constants of the merge pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MergePushConstants {
    prev_cascade_index: u32,
    current_cascade_index: u32,
}

/// The three compute shaders of the 2D pipeline, provided by the host
/// (shader loading is outside the core).
pub struct CascadeShaders2D {
    pub probe_trace: Arc<dyn Shader>,
    pub cascade_merge: Arc<dyn Shader>,
    pub integrate_irradiance: Arc<dyn Shader>,
}

pub struct RadianceCascades2D {
    config: CascadeConfig2D,
    levels: Vec<CascadeLevel2D>,
    textures: Vec<Arc<dyn Texture>>,
    irradiance_texture: Arc<dyn Texture>,
    uniform_buffers: Vec<Arc<dyn Buffer>>,
    trace_pipeline: Arc<dyn ComputePipeline>,
    merge_pipeline: Arc<dyn ComputePipeline>,
    integrate_pipeline: Arc<dyn ComputePipeline>,
    /// Set-4 storage-image group per level, shared by trace and merge
    level_binding_groups: Vec<Arc<dyn BindingGroup>>,
    irradiance_binding_group: Arc<dyn BindingGroup>,
}

impl RadianceCascades2D {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        config: CascadeConfig2D,
        shaders: CascadeShaders2D,
    ) -> Result<Self> {
        config.validate()?;
        let mut levels = derive_levels_2d(&config);

        let trace_pipeline = device.create_compute_pipeline(ComputePipelineDesc {
            name: "rc2d_probe_trace".to_string(),
            shader: shaders.probe_trace,
            push_constants: vec![PushConstantRange {
                stages: ShaderStageFlags::COMPUTE,
                size: std::mem::size_of::<TracePushConstants>() as u32,
            }],
        })?;
        let merge_pipeline = device.create_compute_pipeline(ComputePipelineDesc {
            name: "rc2d_cascade_merge".to_string(),
            shader: shaders.cascade_merge,
            push_constants: vec![PushConstantRange {
                stages: ShaderStageFlags::COMPUTE,
                size: std::mem::size_of::<MergePushConstants>() as u32,
            }],
        })?;
        let integrate_pipeline = device.create_compute_pipeline(ComputePipelineDesc {
            name: "rc2d_integrate_irradiance".to_string(),
            shader: shaders.integrate_irradiance,
            push_constants: vec![],
        })?;

        // Radiance textures: one q x q tile per probe, RGBA32F, linear
        // filtering for the interpolated merge reads.
        let mut textures: Vec<Arc<dyn Texture>> = Vec::with_capacity(levels.len());
        for level in &mut levels {
            let (width, height) = level.texture_extent();
            let texture = device.create_texture(TextureDesc {
                name: format!("[RC] Cascade Texture: {}", level.cascade_level),
                width,
                height,
                depth: 1,
                format: TextureFormat::Rgba32Float,
                kind: TextureKind::D2,
                usage: TextureUsage::SAMPLED | TextureUsage::STORAGE,
                filter: TextureFilter::Linear,
            })?;
            level.cascade_texture_index = texture.bindless_index().get();
            textures.push(texture);
        }

        // Level-0 sibling holding the integrated irradiance.
        let (width, height) = levels[0].texture_extent();
        let irradiance_texture = device.create_texture(TextureDesc {
            name: "[RC] Irradiance Texture".to_string(),
            width,
            height,
            depth: 1,
            format: TextureFormat::Rgba32Float,
            kind: TextureKind::D2,
            usage: TextureUsage::SAMPLED | TextureUsage::STORAGE,
            filter: TextureFilter::Linear,
        })?;
        levels[0].irradiance_texture_index = irradiance_texture.bindless_index().get();

        // Per-level UBOs in the bindless UBO array; shaders read them
        // by cascade index.
        let mut uniform_buffers = Vec::with_capacity(levels.len());
        for level in &levels {
            let buffer = device.create_buffer(BufferDesc {
                name: format!("[RC] Cascade Level Info: {}", level.cascade_level),
                size: std::mem::size_of::<CascadeLevel2D>() as u64,
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
        let irradiance_binding_group = device.create_binding_group(
            PipelineRef::Compute(integrate_pipeline.as_ref()),
            4,
            &[BindingResource::StorageImage(irradiance_texture.as_ref())],
        )?;

        for level in &levels {
            crate::engine_info!(
                "radiant::RadianceCascades2D",
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
            config,
            levels,
            textures,
            irradiance_texture,
            uniform_buffers,
            trace_pipeline,
            merge_pipeline,
            integrate_pipeline,
            level_binding_groups,
            irradiance_binding_group,
        })
    }

    // ===== ACCESSORS =====

    pub fn levels(&self) -> &[CascadeLevel2D] {
        &self.levels
    }

    pub fn irradiance_texture(&self) -> &Arc<dyn Texture> {
        &self.irradiance_texture
    }

    /// Bindless index of the irradiance texture for shading consumers.
    pub fn irradiance_index(&self) -> BindlessIndex {
        self.irradiance_texture.bindless_index()
    }

    /// CPU-computed probe world positions for a level, matching the
    /// shader's centring rule. Used by editor gizmos and tests.
    pub fn probe_positions(&self, cascade_index: u32) -> Vec<Vec2> {
        let Some(level) = self.levels.get(cascade_index as usize) else {
            crate::engine_error!(
                "radiant::RadianceCascades2D",
                "invalid cascade index: {}",
                cascade_index
            );
            return Vec::new();
        };

        let dims = UVec2::from(level.probe_grid_dims);
        let mut positions = Vec::with_capacity((dims.x * dims.y) as usize);
        for x in 0..dims.x {
            for y in 0..dims.y {
                positions.push(level.probe_world_position(UVec2::new(x, y)));
            }
        }
        positions
    }

    // ===== LIVE TUNING =====

    /// Re-derive the distance intervals from a new base range and
    /// rewrite the per-level UBOs. Rejected when the range would drop
    /// below the probe spacing.
    pub fn update_base_range(&mut self, base_range: f32) -> Result<()> {
        if base_range < self.config.base_spacing {
            crate::engine_warn!(
                "radiant::RadianceCascades2D",
                "base range {} below probe spacing {}, ignored",
                base_range,
                self.config.base_spacing
            );
            return Ok(());
        }

        self.config.base_range = base_range;
        let mut prev_max_distance = 0.0f32;
        for (i, level) in self.levels.iter_mut().enumerate() {
            let exponent = i as f32;
            let max_distance = base_range * self.config.range_exp.powf(exponent);
            let next_spacing =
                self.config.base_spacing * self.config.grid_exp.powf(exponent + 1.0);

            level.min_probe_distance = prev_max_distance;
            level.max_probe_distance = max_distance + Vec2::splat(next_spacing).length();
            prev_max_distance = max_distance;

            self.uniform_buffers[i].update(0, bytemuck::bytes_of(level))?;
        }
        Ok(())
    }

    /// Re-derive the probe spacings from a new base spacing and
    /// rewrite the per-level UBOs. Rejected when the spacing would
    /// exceed the base range.
    pub fn update_base_spacing(&mut self, base_spacing: f32) -> Result<()> {
        if base_spacing > self.config.base_range {
            crate::engine_warn!(
                "radiant::RadianceCascades2D",
                "base spacing {} above base range {}, ignored",
                base_spacing,
                self.config.base_range
            );
            return Ok(());
        }

        self.config.base_spacing = base_spacing;
        for (i, level) in self.levels.iter_mut().enumerate() {
            let spacing = base_spacing * self.config.grid_exp.powf(i as f32);
            level.probe_spacing = [spacing, spacing];
            self.uniform_buffers[i].update(0, bytemuck::bytes_of(level))?;
        }
        Ok(())
    }

    // ===== RECORDING =====

    /// Record the full GI chain: trace, merge, integrate.
    ///
    /// Returns `false` without recording anything when the TLAS is
    /// unbuilt or empty; the irradiance texture then retains the
    /// previous frame's data.
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
        self.record_merge(list)?;
        self.record_integrate(list)?;
        Ok(true)
    }

    /// Probe trace: one dispatch per cascade level over its texel
    /// grid, TLAS and sky sampled through bindless indices.
    fn record_trace(
        &self,
        list: &mut dyn CommandList,
        tlas: &dyn Tlas,
        skybox_texture_index: BindlessIndex,
        light_count: u32,
    ) -> Result<()> {
        // Whole-ladder rewrite: previous contents are irrelevant.
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

            let (width, height) = level.texture_extent();
            list.dispatch(
                width.div_ceil(WORK_GROUP_SIZE),
                height.div_ceil(WORK_GROUP_SIZE),
                1,
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

    /// Merge: numCascades - 1 passes folding each coarser cascade into
    /// the next finer one, with a barrier between passes so each
    /// cascade's writes are visible before it is read.
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

            let (width, height) = self.levels[current].texture_extent();
            list.dispatch(
                width.div_ceil(WORK_GROUP_SIZE),
                height.div_ceil(WORK_GROUP_SIZE),
                1,
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

    /// Irradiance integration over cascade 0's direction tiles into
    /// the irradiance texture.
    fn record_integrate(&self, list: &mut dyn CommandList) -> Result<()> {
        list.image_barrier(
            self.irradiance_texture.as_ref(),
            ImageTransition {
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::General,
                src_access: Access::NONE,
                dst_access: Access::SHADER_WRITE,
            },
        )?;

        list.bind_compute_pipeline(self.integrate_pipeline.as_ref())?;
        list.bind_binding_group(self.irradiance_binding_group.as_ref())?;

        let (width, height) = self.levels[0].texture_extent();
        list.dispatch(
            width.div_ceil(WORK_GROUP_SIZE),
            height.div_ceil(WORK_GROUP_SIZE),
            1,
        )?;

        list.image_barrier(
            self.irradiance_texture.as_ref(),
            ImageTransition {
                old_layout: ImageLayout::General,
                new_layout: ImageLayout::ShaderReadOnly,
                src_access: Access::SHADER_WRITE,
                dst_access: Access::SHADER_READ,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cascades_2d_tests.rs"]
mod tests;
