/// CPU acceleration structures.
///
/// Two spatial indexes share one node layout:
/// - `StaticBvh`: SAH-built once from the immovable set, immutable after
/// - `DynamicBvh`: incremental insert/remove/update with rotations
///
/// Both answer AABB-overlap queries with unique entity sets. The GPU
/// BLAS/TLAS layer lives behind `graphics_device::acceleration_structure`.

pub mod bounding_box;
pub mod node;
pub mod static_bvh;
pub mod dynamic_bvh;

pub use bounding_box::BoundingBox;
pub use node::{BvhNode, NULL_NODE};
pub use static_bvh::{StaticBvh, StaticLeaf};
pub use dynamic_bvh::DynamicBvh;
