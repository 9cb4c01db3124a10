/// Bindless resource indexing.
///
/// Every GPU resource a shader can reach is referenced by a stable
/// `u32` index into a global array (one array per resource class).
/// Slots are recycled, but only after the last frame that could have
/// referenced them has completed.

pub mod registry;

pub use registry::{BindlessIndex, BindlessRegistry, ResourceClass};
