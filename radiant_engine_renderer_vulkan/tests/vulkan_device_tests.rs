//! GPU integration tests for the Vulkan backend.
//!
//! These need a ray-tracing-capable GPU, a display, and an installed
//! Vulkan driver, so they are `#[ignore]`d by default:
//!
//! ```text
//! cargo test -p radiant_engine_renderer_vulkan -- --ignored
//! ```

use std::sync::{Arc, Mutex};
use radiant_engine::graphics_device::{
    BufferDesc, BufferUsage, DeviceConfig, GraphicsDevice, TextureDesc, TextureFilter,
    TextureFormat, TextureKind, TextureUsage,
};
use radiant_engine_renderer_vulkan::VulkanGraphicsDevice;
use winit::event_loop::EventLoop;
use winit::window::Window;

fn create_device() -> (Arc<Mutex<VulkanGraphicsDevice>>, Window) {
    #[allow(deprecated)]
    let event_loop = EventLoop::new().expect("event loop");
    #[allow(deprecated)]
    let window = event_loop
        .create_window(Window::default_attributes().with_visible(false))
        .expect("window");

    let device = VulkanGraphicsDevice::new(
        &window,
        DeviceConfig {
            app_name: "radiant tests".to_string(),
            ..Default::default()
        },
    )
    .expect("vulkan device");

    // The event loop is intentionally leaked to keep the window valid.
    std::mem::forget(event_loop);
    (Arc::new(Mutex::new(device)), window)
}

#[test]
#[ignore]
fn test_device_reports_ray_tracing_caps() {
    let (device, _window) = create_device();
    let device_guard = device.lock().unwrap();
    assert!(device_guard.caps().ray_tracing);
    assert!(device_guard.frames_in_flight() >= 2);
}

#[test]
#[ignore]
fn test_texture_gets_stable_bindless_index() {
    let (device, _window) = create_device();
    let mut device_guard = device.lock().unwrap();

    let texture = device_guard
        .create_texture(TextureDesc {
            name: "test".to_string(),
            width: 64,
            height: 64,
            depth: 1,
            format: TextureFormat::Rgba32Float,
            kind: TextureKind::D2,
            usage: TextureUsage::SAMPLED | TextureUsage::STORAGE,
            filter: TextureFilter::Nearest,
        })
        .unwrap();

    assert!(!texture.bindless_index().is_null());
    assert!(!texture.storage_index().is_null());
}

#[test]
#[ignore]
fn test_uniform_buffer_round_trip() {
    let (device, _window) = create_device();
    let mut device_guard = device.lock().unwrap();

    let buffer = device_guard
        .create_buffer(BufferDesc {
            name: "camera".to_string(),
            size: 256,
            usage: BufferUsage::Uniform,
            cpu_visible: true,
        })
        .unwrap();

    assert!(!buffer.bindless_index().is_null());
    buffer.update(0, &[7u8; 64]).unwrap();

    // Overruns are rejected, not UB.
    assert!(buffer.update(224, &[0u8; 64]).is_err());
}

#[test]
#[ignore]
fn test_acquire_and_present_empty_frame() {
    let (device, _window) = create_device();
    let mut device_guard = device.lock().unwrap();

    let frame = device_guard.acquire_frame().unwrap();
    frame.compute_list.lock().unwrap().begin().unwrap();
    frame.compute_list.lock().unwrap().end().unwrap();
    frame.graphics_list.lock().unwrap().begin().unwrap();
    frame.graphics_list.lock().unwrap().end().unwrap();
    device_guard.submit_frame(frame).unwrap();
    device_guard.wait_idle().unwrap();
}
