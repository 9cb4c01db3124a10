/// Binding groups — per-pass descriptor sets.
///
/// The global bindless set (set 0) is owned by the backend and bound
/// implicitly with every pipeline. Binding groups cover the remaining
/// sets: per-material texture sets (set 1) and the per-pass transient
/// sets (set 4, cascade storage images), rebuilt from bindless handles
/// each time the resources change.

use super::buffer::Buffer;
use super::texture::Texture;

/// One resource slot in a binding group, in binding order.
pub enum BindingResource<'a> {
    UniformBuffer(&'a dyn Buffer),
    StorageBuffer(&'a dyn Buffer),
    SampledTexture(&'a dyn Texture),
    StorageImage(&'a dyn Texture),
}

/// Binding group trait
///
/// Implemented by backend-specific descriptor sets. A group is
/// immutable after creation; recreate it when its resources change.
pub trait BindingGroup: Send + Sync {
    /// The set index this group binds at.
    fn set_index(&self) -> u32;
}
