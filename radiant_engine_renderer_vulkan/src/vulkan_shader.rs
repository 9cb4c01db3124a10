/// Shader - Vulkan shader module with SPIR-V reflection.
///
/// Reflection (spirq) extracts the push-constant size so pipeline
/// creation can cross-check the declared ranges against the SPIR-V.

use std::sync::Arc;
use ash::vk;
use spirq::prelude::*;
use radiant_engine::error::Result;
use radiant_engine::{engine_err, engine_warn};
use radiant_engine::graphics_device::{Shader as CoreShader, ShaderDesc};

pub struct Shader {
    pub(crate) module: vk::ShaderModule,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) desc: ShaderDesc,
    /// Push-constant block size reported by reflection (0 if none)
    pub(crate) push_constant_size: u32,
}

impl Shader {
    pub fn new(device: Arc<ash::Device>, desc: ShaderDesc) -> Result<Self> {
        if desc.spirv.is_empty() {
            return Err(engine_err!(
                "radiant::vulkan",
                "shader '{}' has no SPIR-V code",
                desc.name
            ));
        }

        let module = unsafe {
            let create_info = vk::ShaderModuleCreateInfo::default().code(&desc.spirv);
            device.create_shader_module(&create_info, None).map_err(|e| {
                engine_err!(
                    "radiant::vulkan",
                    "Failed to create shader module '{}': {:?}",
                    desc.name,
                    e
                )
            })?
        };

        let push_constant_size = Self::reflect_push_constants(&desc);

        Ok(Self {
            module,
            device,
            desc,
            push_constant_size,
        })
    }

    fn reflect_push_constants(desc: &ShaderDesc) -> u32 {
        let entry_points = match ReflectConfig::new()
            .spv(desc.spirv.as_slice())
            .ref_all_rscs(true)
            .reflect()
        {
            Ok(entry_points) => entry_points,
            Err(e) => {
                engine_warn!(
                    "radiant::vulkan",
                    "reflection failed for shader '{}': {}",
                    desc.name,
                    e
                );
                return 0;
            }
        };

        entry_points
            .iter()
            .flat_map(|entry| entry.vars.iter())
            .filter_map(|var| match var {
                Variable::PushConstant { ty, .. } => ty.nbyte().map(|size| size as u32),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn raw(&self) -> vk::ShaderModule {
        self.module
    }
}

impl CoreShader for Shader {
    fn desc(&self) -> &ShaderDesc {
        &self.desc
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
