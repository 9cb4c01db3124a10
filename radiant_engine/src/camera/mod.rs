/// Camera module - camera data and frustum culling

pub mod camera;
pub mod frustum;

pub use camera::Camera;
pub use frustum::{Frustum, FrustumTest};
