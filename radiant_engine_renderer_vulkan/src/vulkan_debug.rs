/// Validation layer support, compiled in only with the
/// `vulkan-validation` feature.
///
/// Installs VK_LAYER_KHRONOS_validation plus a debug-utils messenger
/// that routes validation messages into the engine log.

use std::ffi::CStr;
use ash::vk;
use radiant_engine::graphics_device::DeviceConfig;
use radiant_engine::error::Result;
use radiant_engine::{engine_err, engine_warn, engine_error, engine_debug};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Layer name pointers for instance creation; empty when validation is
/// disabled in the config or the layer is not installed.
pub fn validation_layers(entry: &ash::Entry, config: &DeviceConfig) -> Vec<*const i8> {
    if !config.enable_validation {
        return Vec::new();
    }

    let available = unsafe {
        entry
            .enumerate_instance_layer_properties()
            .unwrap_or_default()
    };
    let installed = available.iter().any(|layer| unsafe {
        CStr::from_ptr(layer.layer_name.as_ptr()) == VALIDATION_LAYER
    });

    if installed {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        engine_warn!(
            "radiant::vulkan",
            "validation requested but VK_LAYER_KHRONOS_validation is not installed"
        );
        Vec::new()
    }
}

unsafe extern "system" fn messenger_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*callback_data).p_message).to_string_lossy()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        engine_error!("radiant::vulkan::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        engine_warn!("radiant::vulkan::validation", "{}", message);
    } else {
        engine_debug!("radiant::vulkan::validation", "{}", message);
    }

    vk::FALSE
}

pub struct DebugMessenger {
    loader: Option<ash::ext::debug_utils::Instance>,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &DeviceConfig,
    ) -> Result<Self> {
        if !config.enable_validation {
            return Ok(Self {
                loader: None,
                messenger: vk::DebugUtilsMessengerEXT::null(),
            });
        }

        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(messenger_callback));

        let messenger = unsafe {
            loader
                .create_debug_utils_messenger(&create_info, None)
                .map_err(|e| {
                    engine_err!("radiant::vulkan", "Failed to create debug messenger: {:?}", e)
                })?
        };

        Ok(Self {
            loader: Some(loader),
            messenger,
        })
    }

    pub fn destroy(&self) {
        if let Some(loader) = &self.loader {
            unsafe {
                loader.destroy_debug_utils_messenger(self.messenger, None);
            }
        }
    }
}
