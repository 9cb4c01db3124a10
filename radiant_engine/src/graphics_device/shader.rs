/// Shader trait and shader descriptor

use bitflags::bitflags;

bitflags! {
    /// Pipeline stages a resource or push-constant range is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX   = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE  = 1 << 2;
    }
}

/// Descriptor for creating a shader module from SPIR-V words.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Debug name
    pub name: String,
    /// SPIR-V code
    pub spirv: Vec<u32>,
    /// Entry point, typically "main"
    pub entry_point: String,
}

/// Shader module trait
///
/// Implemented by backend-specific shader types; backends may reflect
/// the SPIR-V to validate descriptor interfaces.
pub trait Shader: Send + Sync {
    /// The descriptor the shader was created with.
    fn desc(&self) -> &ShaderDesc;
}
