/// Rasterization passes.
///
/// The G-buffer pass fills the deferred attachments and marks the
/// selected entity in the stencil; the outline pass reads that
/// depth-stencil and composites a border into the swap image.

pub mod selection;
pub mod gbuffer_pass;
pub mod outline_pass;

pub use selection::SelectionChannel;
pub use gbuffer_pass::{GBufferPass, GBufferShaders};
pub use outline_pass::{OutlinePass, OutlineSettings, OutlineShaders};
