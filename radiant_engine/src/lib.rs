/*!
# Radiant Engine

Real-time global-illumination core built on a multi-level radiance
cascade volume fed by a hardware ray-tracing acceleration-structure
layer over a compact spatial index.

This crate is the platform-agnostic core. All GPU work is expressed
against trait objects (`GraphicsDevice`, `CommandList`, `Texture`,
`Buffer`, `Blas`, `Tlas`, ...) so that backends can be swapped and the
core can be tested without a GPU. The Vulkan backend lives in the
`radiant_engine_renderer_vulkan` crate.

## Architecture

- **accel**: bounding-volume algebra, static SAH BVH and dynamic BVH
- **cascade**: cascade volume model, probe tracer, merger, integrator
- **passes**: deferred G-buffer and selection-outline passes
- **bindless**: stable `u32` resource indices with slot recycling
- **scene**: entity arena, component records, BLAS/TLAS registration
- **renderer**: host-owned orchestrator driving one frame end to end

The host owns a `Renderer` value; there are no engine singletons.
*/

// Error handling module
pub mod error;

// Internal logging system (Logger trait + engine_* macros)
pub mod log;

// Bounding volumes and CPU acceleration structures
pub mod accel;

// Camera and frustum culling
pub mod camera;

// Backend abstraction layer (traits + descriptors + mock device)
pub mod graphics_device;

// Bindless slot allocation and resource registry
pub mod bindless;

// Radiance cascade GI engine
pub mod cascade;

// Rasterization passes (G-buffer, selection outline)
pub mod passes;

// Scene arena and acceleration-structure registration
pub mod scene;

// Frame orchestration
pub mod renderer;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export math library
pub use glam;
