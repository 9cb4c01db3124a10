/// Cascade build parameters and validation.
///
/// The angular convention: `base_angular_resolution` is the edge of a
/// probe's square direction tile, so a probe stores Q^2 directions.
/// This holds for both the 2D and the 3D variant; configurations with
/// Q < 2 are rejected.

use glam::{UVec2, UVec3, Vec2, Vec3};
use crate::error::{Error, Result};

/// Hard upper bound on the cascade count.
pub const MAX_CASCADES: u32 = 4;

/// Build parameters for the 2D cascade ladder.
#[derive(Debug, Clone, Copy)]
pub struct CascadeConfig2D {
    /// dmax of cascade 0 (before the seam-overlap term)
    pub base_range: f32,
    /// Per-level growth of the distance interval
    pub range_exp: f32,
    /// Probe spacing of cascade 0
    pub base_spacing: f32,
    /// Per-level grid shrink / spacing growth factor
    pub grid_exp: f32,
    /// Probe grid of cascade 0
    pub base_grid_dims: UVec2,
    /// Direction-tile edge of cascade 0 (Q; Q^2 directions per probe)
    pub base_angular_resolution: u32,
    /// Per-level growth of the direction-tile edge
    pub angular_exp: f32,
    /// Number of cascade levels, at most `MAX_CASCADES`
    pub num_cascades: u32,
    /// World-space centre of the probe volume
    pub origin: Vec2,
}

impl Default for CascadeConfig2D {
    fn default() -> Self {
        Self {
            base_range: 1.0,
            range_exp: 4.0,
            base_spacing: 0.5,
            grid_exp: 2.0,
            base_grid_dims: UVec2::new(64, 64),
            base_angular_resolution: 4,
            angular_exp: 2.0,
            num_cascades: 4,
            origin: Vec2::ZERO,
        }
    }
}

impl CascadeConfig2D {
    /// Reject configurations that would produce a malformed ladder.
    pub fn validate(&self) -> Result<()> {
        if self.num_cascades == 0 || self.num_cascades > MAX_CASCADES {
            return Err(Error::Precondition(format!(
                "cascade count {} outside 1..={}",
                self.num_cascades, MAX_CASCADES
            )));
        }
        if self.base_range <= 0.0 || self.range_exp <= 0.0 {
            return Err(Error::Precondition("range parameters must be positive".into()));
        }
        if self.base_spacing <= 0.0 || self.grid_exp <= 0.0 {
            return Err(Error::Precondition("grid parameters must be positive".into()));
        }
        if self.base_spacing > self.base_range {
            return Err(Error::Precondition(format!(
                "base spacing {} exceeds base range {}",
                self.base_spacing, self.base_range
            )));
        }
        if self.base_grid_dims.x == 0 || self.base_grid_dims.y == 0 {
            return Err(Error::Precondition("grid dimensions must be nonzero".into()));
        }
        if self.base_angular_resolution < 2 {
            return Err(Error::Precondition(format!(
                "angular resolution {} below the minimum tile edge of 2",
                self.base_angular_resolution
            )));
        }
        if self.angular_exp < 1.0 {
            return Err(Error::Precondition("angular growth must be >= 1".into()));
        }
        Ok(())
    }
}

/// Build parameters for the 3D cascade ladder.
#[derive(Debug, Clone, Copy)]
pub struct CascadeConfig3D {
    pub base_range: f32,
    pub range_exp: f32,
    /// Probe spacing of cascade 0, per axis
    pub base_spacing: Vec3,
    pub grid_exp: f32,
    /// Probe grid of cascade 0; each axis shrinks independently
    pub base_grid_dims: UVec3,
    /// Direction-tile edge of cascade 0 (Q; Q^2 directions per probe)
    pub base_angular_resolution: u32,
    pub angular_exp: f32,
    pub num_cascades: u32,
    /// World-space centre of the probe volume
    pub origin: Vec3,
}

impl Default for CascadeConfig3D {
    fn default() -> Self {
        Self {
            base_range: 1.0,
            range_exp: 4.0,
            base_spacing: Vec3::splat(0.5),
            grid_exp: 2.0,
            base_grid_dims: UVec3::new(32, 16, 32),
            base_angular_resolution: 4,
            angular_exp: 2.0,
            num_cascades: 4,
            origin: Vec3::ZERO,
        }
    }
}

impl CascadeConfig3D {
    /// Reject configurations that would produce a malformed ladder.
    pub fn validate(&self) -> Result<()> {
        if self.num_cascades == 0 || self.num_cascades > MAX_CASCADES {
            return Err(Error::Precondition(format!(
                "cascade count {} outside 1..={}",
                self.num_cascades, MAX_CASCADES
            )));
        }
        if self.base_range <= 0.0 || self.range_exp <= 0.0 {
            return Err(Error::Precondition("range parameters must be positive".into()));
        }
        if self.base_spacing.min_element() <= 0.0 || self.grid_exp <= 0.0 {
            return Err(Error::Precondition("grid parameters must be positive".into()));
        }
        if self.base_grid_dims.min_element() == 0 {
            return Err(Error::Precondition("grid dimensions must be nonzero".into()));
        }
        if self.base_angular_resolution < 2 {
            return Err(Error::Precondition(format!(
                "angular resolution {} below the minimum tile edge of 2",
                self.base_angular_resolution
            )));
        }
        if self.angular_exp < 1.0 {
            return Err(Error::Precondition("angular growth must be >= 1".into()));
        }
        Ok(())
    }
}
