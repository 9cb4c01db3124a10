/// Tests for OutlinePass
///
/// No-op without a selection; with one, a single draw over the swap
/// image with LOAD (not CLEAR) and the full push-constant block.

use super::*;
use glam::Vec3;
use std::sync::{Arc, Mutex};
use crate::accel::BoundingBox;
use crate::graphics_device::mock_graphics_device::{
    MockCommand, MockGraphicsDevice, MockShader,
};
use crate::graphics_device::{
    BufferDesc, BufferUsage, GraphicsDevice, IndexType, PipelineRef, TextureDesc, TextureFilter,
    TextureFormat, TextureKind, TextureUsage, VertexLayout,
};
use crate::scene::{EntityKey, MaterialComponent, MeshComponent, Scene};

fn make_device() -> Arc<Mutex<MockGraphicsDevice>> {
    Arc::new(Mutex::new(MockGraphicsDevice::new()))
}

fn make_pass(device: &Arc<Mutex<MockGraphicsDevice>>) -> OutlinePass {
    let mut device_guard = device.lock().unwrap();
    OutlinePass::new(
        &mut *device_guard,
        OutlineShaders {
            vertex: MockShader::new("outline_vs"),
            fragment: MockShader::new("outline_fs"),
        },
    )
    .unwrap()
}

fn make_depth_stencil(device: &Arc<Mutex<MockGraphicsDevice>>) -> Arc<dyn Texture> {
    device
        .lock()
        .unwrap()
        .create_texture(TextureDesc {
            name: "depth".to_string(),
            width: 1280,
            height: 720,
            depth: 1,
            format: TextureFormat::Depth24Stencil8,
            kind: TextureKind::D2,
            usage: TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED,
            filter: TextureFilter::Nearest,
        })
        .unwrap()
}

fn scene_with_cube(device: &Arc<Mutex<MockGraphicsDevice>>) -> (Scene, EntityKey) {
    let mut scene = Scene::new(device.clone() as Arc<Mutex<dyn GraphicsDevice>>);
    let entity = scene.create_entity();

    let mut device_guard = device.lock().unwrap();
    let vertex_buffer = device_guard
        .create_buffer(BufferDesc {
            name: "verts".to_string(),
            size: 288,
            usage: BufferUsage::Vertex,
            cpu_visible: false,
        })
        .unwrap();
    let index_buffer = device_guard
        .create_buffer(BufferDesc {
            name: "indices".to_string(),
            size: 144,
            usage: BufferUsage::Index,
            cpu_visible: false,
        })
        .unwrap();
    let pipeline = device_guard
        .create_graphics_pipeline(crate::graphics_device::GraphicsPipelineDesc {
            name: "mat".to_string(),
            vertex_shader: MockShader::new("vs"),
            fragment_shader: MockShader::new("fs"),
            color_formats: vec![],
            blend_modes: vec![],
            depth_stencil_format: None,
            depth_stencil: Default::default(),
            cull_mode: crate::graphics_device::CullMode::Back,
            push_constants: vec![],
        })
        .unwrap();
    let binding_group = device_guard
        .create_binding_group(PipelineRef::Graphics(pipeline.as_ref()), 1, &[])
        .unwrap();
    drop(device_guard);

    scene.set_mesh(
        entity,
        MeshComponent {
            vertex_buffer,
            index_buffer,
            vertex_count: 24,
            vertex_stride: 12,
            position_offset: 0,
            index_count: 36,
            index_type: IndexType::U32,
            layout: VertexLayout::default(),
            is_static: false,
            is_enabled: true,
            loading: false,
        },
    );
    scene.set_material(
        entity,
        MaterialComponent {
            binding_group,
            ready: true,
        },
    );
    scene.set_local_bounds(
        entity,
        BoundingBox::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
    );

    (scene, entity)
}

#[test]
fn test_noop_without_selection() {
    let device = make_device();
    let pass = make_pass(&device);
    let depth = make_depth_stencil(&device);

    let (list, log) = MockGraphicsDevice::standalone_list();
    let mut list_guard = list.lock().unwrap();
    list_guard.begin().unwrap();
    let rendered = pass
        .record(
            &mut *list_guard,
            (1280, 720),
            None,
            depth.as_ref(),
            crate::bindless::BindlessIndex::NULL,
        )
        .unwrap();
    list_guard.end().unwrap();
    drop(list_guard);

    assert!(!rendered);
    assert_eq!(log.lock().unwrap().len(), 2); // Begin + End only
}

#[test]
fn test_outline_draws_over_swapchain_with_load() {
    let device = make_device();
    let pass = make_pass(&device);
    let depth = make_depth_stencil(&device);
    let (scene, _entity) = scene_with_cube(&device);

    let items = scene.draw_items();
    let (list, log) = MockGraphicsDevice::standalone_list();
    {
        let mut list_guard = list.lock().unwrap();
        list_guard.begin().unwrap();
        let rendered = pass
            .record(
                &mut *list_guard,
                (1280, 720),
                Some(&items[0]),
                depth.as_ref(),
                crate::bindless::BindlessIndex::NULL,
            )
            .unwrap();
        list_guard.end().unwrap();
        assert!(rendered);
    }
    let commands = log.lock().unwrap().clone();

    let begin = commands
        .iter()
        .find_map(|c| match c {
            MockCommand::BeginRendering {
                color_targets,
                color_load_ops,
                has_depth_stencil,
                ..
            } => Some((color_targets.clone(), color_load_ops.clone(), *has_depth_stencil)),
            _ => None,
        })
        .unwrap();

    assert_eq!(begin.0, vec!["swapchain".to_string()]);
    // Composites over the lit frame rather than clearing it.
    assert_eq!(begin.1, vec![LoadOp::Load]);
    // The depth-stencil is sampled, never attached.
    assert!(!begin.2);

    let draws = commands
        .iter()
        .filter(|c| matches!(c, MockCommand::DrawIndexed { .. }))
        .count();
    assert_eq!(draws, 1);
}

#[test]
fn test_push_constants_carry_border_and_depth_index() {
    let device = make_device();
    let mut pass = make_pass(&device);
    pass.set_settings(OutlineSettings {
        border_width: 0.05,
        color: [0.0, 1.0, 0.0, 1.0],
    });
    let depth = make_depth_stencil(&device);
    let (scene, _) = scene_with_cube(&device);

    let items = scene.draw_items();
    let (list, log) = MockGraphicsDevice::standalone_list();
    {
        let mut list_guard = list.lock().unwrap();
        list_guard.begin().unwrap();
        pass.record(
            &mut *list_guard,
            (1280, 720),
            Some(&items[0]),
            depth.as_ref(),
            crate::bindless::BindlessIndex::NULL,
        )
        .unwrap();
        list_guard.end().unwrap();
    }
    let commands = log.lock().unwrap().clone();

    let (data, stages) = commands
        .iter()
        .find_map(|c| match c {
            MockCommand::PushConstants { data, stages } => Some((data.clone(), *stages)),
            _ => None,
        })
        .unwrap();

    assert_eq!(stages, ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT);

    let floats: &[f32] = bytemuck::cast_slice(&data[64..84]);
    // color then border width
    assert_eq!(&floats[0..4], &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(floats[4], 0.05);

    let depth_index = u32::from_le_bytes(data[84..88].try_into().unwrap());
    assert_eq!(depth_index, depth.bindless_index().get());
}
