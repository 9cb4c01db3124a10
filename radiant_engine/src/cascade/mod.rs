/// Radiance cascade GI engine.
///
/// A cascade is one level of the probe volume: its own grid, spacing,
/// distance interval, and angular resolution. Per frame the tracer
/// rewrites every level's radiance texture against the TLAS, the
/// merger folds each coarser level into the next finer one, and the
/// integrator condenses cascade 0 into irradiance.
///
/// The angular mapping and the tile layout are pure functions shared
/// by every pass (and by the shaders, by contract), unit-tested on the
/// CPU.

pub mod config;
pub mod level;
pub mod angular;
pub mod layout;
pub mod cascades_2d;
pub mod cascades_3d;

pub use config::{CascadeConfig2D, CascadeConfig3D, MAX_CASCADES};
pub use level::{CascadeLevel2D, CascadeLevel3D};
pub use cascades_2d::RadianceCascades2D;
pub use cascades_3d::RadianceCascades3D;
