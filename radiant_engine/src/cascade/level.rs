/// Cascade level geometry — the GPU-mirrored per-level records and
/// their derivation from a config.
///
/// Derivation for level `i` (0-indexed):
/// - `dmax(i) = base_range * range_exp^i`, `dmin(i) = dmax(i-1)`,
///   `dmin(0) = 0`; `dmax` is then extended by the diagonal of
///   `spacing(i+1)` to hide interval seams.
/// - `grid_dims(i) = max(1, round(base_grid_dims / grid_exp^i))`,
///   per axis in 3D.
/// - `spacing(i) = base_spacing * grid_exp^i`.
/// - `q(i) = max(2, base_q * angular_exp^i)` (tile edge; a probe
///   stores q^2 directions).
///
/// The structs are `#[repr(C)]` and uploaded verbatim into the
/// per-cascade uniform buffers; shaders index them through the
/// bindless UBO array by cascade index.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, UVec3, Vec2, Vec3};
use super::config::{CascadeConfig2D, CascadeConfig3D};

/// GPU mirror of one 2D cascade level (std140-compatible).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CascadeLevel2D {
    pub cascade_level: u32,
    /// Direction-tile edge; q^2 directions per probe
    pub angular_resolution: u32,
    /// Bindless index of the radiance texture
    pub cascade_texture_index: u32,
    /// Bindless index of the irradiance texture (level 0 only,
    /// `u32::MAX` elsewhere)
    pub irradiance_texture_index: u32,
    pub probe_grid_dims: [u32; 2],
    pub probe_spacing: [f32; 2],
    pub probe_origin: [f32; 2],
    pub min_probe_distance: f32,
    pub max_probe_distance: f32,
}

impl CascadeLevel2D {
    /// Radiance texture extent: one q x q tile per probe.
    pub fn texture_extent(&self) -> (u32, u32) {
        (
            self.probe_grid_dims[0] * self.angular_resolution,
            self.probe_grid_dims[1] * self.angular_resolution,
        )
    }

    /// Number of directions stored per probe.
    pub fn direction_count(&self) -> u32 {
        self.angular_resolution * self.angular_resolution
    }

    /// World position of a probe, with the grid centred on the origin.
    pub fn probe_world_position(&self, probe: UVec2) -> Vec2 {
        let spacing = Vec2::from(self.probe_spacing);
        let dims = UVec2::from(self.probe_grid_dims);
        let grid_position = probe.as_vec2() * spacing;
        let centring_shift = spacing * (dims - UVec2::ONE).as_vec2() * 0.5;
        grid_position - centring_shift + Vec2::from(self.probe_origin)
    }
}

/// GPU mirror of one 3D cascade level (std140-compatible).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CascadeLevel3D {
    pub cascade_level: u32,
    /// Direction-tile edge; q^2 directions per probe
    pub angular_resolution: u32,
    /// Bindless index of the radiance texture
    pub cascade_texture_index: u32,
    pub _pad0: u32,
    pub probe_grid_dims: [u32; 3],
    pub _pad1: u32,
    pub probe_spacing: [f32; 3],
    pub _pad2: f32,
    pub probe_origin: [f32; 3],
    pub min_probe_distance: f32,
    pub max_probe_distance: f32,
    pub _pad3: [f32; 3],
}

impl CascadeLevel3D {
    /// Radiance texture extent: (gx*q, gz*q) with gy array layers.
    pub fn texture_extent(&self) -> (u32, u32, u32) {
        (
            self.probe_grid_dims[0] * self.angular_resolution,
            self.probe_grid_dims[2] * self.angular_resolution,
            self.probe_grid_dims[1],
        )
    }

    /// Number of directions stored per probe.
    pub fn direction_count(&self) -> u32 {
        self.angular_resolution * self.angular_resolution
    }

    /// World position of a probe, with the grid centred on the origin.
    pub fn probe_world_position(&self, probe: UVec3) -> Vec3 {
        let spacing = Vec3::from(self.probe_spacing);
        let dims = UVec3::from(self.probe_grid_dims);
        let grid_position = probe.as_vec3() * spacing;
        let centring_shift = spacing * (dims - UVec3::ONE).as_vec3() * 0.5;
        grid_position - centring_shift + Vec3::from(self.probe_origin)
    }
}

// ===== DERIVATION =====

/// Derive the 2D ladder. The config must already be validated.
pub fn derive_levels_2d(config: &CascadeConfig2D) -> Vec<CascadeLevel2D> {
    let mut levels = Vec::with_capacity(config.num_cascades as usize);
    let mut prev_max_distance = 0.0f32;

    for i in 0..config.num_cascades {
        let exponent = i as f32;
        let max_distance = config.base_range * config.range_exp.powf(exponent);

        let scaled_dims = Vec2::new(
            config.base_grid_dims.x as f32,
            config.base_grid_dims.y as f32,
        ) / config.grid_exp.powf(exponent);
        let grid_dims = UVec2::new(
            (scaled_dims.x.round() as u32).max(1),
            (scaled_dims.y.round() as u32).max(1),
        );

        let spacing = config.base_spacing * config.grid_exp.powf(exponent);

        let angular_resolution = ((config.base_angular_resolution as f32
            * config.angular_exp.powf(exponent)) as u32)
            .max(2);

        // Overlap term: diagonal of the next level's probe spacing,
        // applied after the interval chain so dmin(i+1) = dmax(i)
        // holds on the unpadded values.
        let next_spacing = config.base_spacing * config.grid_exp.powf(exponent + 1.0);
        let overlap = Vec2::splat(next_spacing).length();

        levels.push(CascadeLevel2D {
            cascade_level: i,
            angular_resolution,
            cascade_texture_index: u32::MAX,
            irradiance_texture_index: u32::MAX,
            probe_grid_dims: grid_dims.into(),
            probe_spacing: [spacing, spacing],
            probe_origin: config.origin.into(),
            min_probe_distance: prev_max_distance,
            max_probe_distance: max_distance + overlap,
        });

        prev_max_distance = max_distance;
    }

    levels
}

/// Derive the 3D ladder. The config must already be validated.
pub fn derive_levels_3d(config: &CascadeConfig3D) -> Vec<CascadeLevel3D> {
    let mut levels = Vec::with_capacity(config.num_cascades as usize);
    let mut prev_max_distance = 0.0f32;

    for i in 0..config.num_cascades {
        let exponent = i as f32;
        let max_distance = config.base_range * config.range_exp.powf(exponent);

        let scaled_dims = config.base_grid_dims.as_vec3() / config.grid_exp.powf(exponent);
        let grid_dims = UVec3::new(
            (scaled_dims.x.round() as u32).max(1),
            (scaled_dims.y.round() as u32).max(1),
            (scaled_dims.z.round() as u32).max(1),
        );

        let spacing = config.base_spacing * config.grid_exp.powf(exponent);

        let angular_resolution = ((config.base_angular_resolution as f32
            * config.angular_exp.powf(exponent)) as u32)
            .max(2);

        let next_spacing = config.base_spacing * config.grid_exp.powf(exponent + 1.0);
        let overlap = next_spacing.length();

        levels.push(CascadeLevel3D {
            cascade_level: i,
            angular_resolution,
            cascade_texture_index: u32::MAX,
            _pad0: 0,
            probe_grid_dims: grid_dims.into(),
            _pad1: 0,
            probe_spacing: spacing.into(),
            _pad2: 0.0,
            probe_origin: config.origin.into(),
            min_probe_distance: prev_max_distance,
            max_probe_distance: max_distance + overlap,
            _pad3: [0.0; 3],
        });

        prev_max_distance = max_distance;
    }

    levels
}

#[cfg(test)]
#[path = "level_tests.rs"]
mod tests;
