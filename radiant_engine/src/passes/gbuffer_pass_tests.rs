/// Tests for GBufferPass
///
/// Uses the mock device to check attachment setup, clear policy,
/// per-draw stencil gating, frustum culling, and the end-of-pass
/// transitions to shader-read.

use super::*;
use glam::{Mat4, Vec3};
use std::sync::{Arc, Mutex};
use crate::accel::BoundingBox;
use crate::graphics_device::mock_graphics_device::{
    MockCommand, MockGraphicsDevice, MockShader,
};
use crate::graphics_device::{
    BufferDesc, BufferUsage, GraphicsDevice, IndexType, PipelineRef, VertexLayout,
};
use crate::scene::{MaterialComponent, MeshComponent, Scene};

fn make_device() -> Arc<Mutex<MockGraphicsDevice>> {
    Arc::new(Mutex::new(MockGraphicsDevice::new()))
}

fn make_pass(device: &Arc<Mutex<MockGraphicsDevice>>) -> GBufferPass {
    let mut device_guard = device.lock().unwrap();
    GBufferPass::new(
        &mut *device_guard,
        GBufferShaders {
            vertex: MockShader::new("gbuffer_vs"),
            fragment: MockShader::new("gbuffer_fs"),
        },
    )
    .unwrap()
}

/// A scene with one renderable unit cube at the given position.
fn scene_with_cube(
    device: &Arc<Mutex<MockGraphicsDevice>>,
    position: Vec3,
) -> (Scene, crate::scene::EntityKey) {
    let mut scene = Scene::new(device.clone() as Arc<Mutex<dyn GraphicsDevice>>);
    let entity = scene.create_entity();

    let (vertex_buffer, index_buffer) = {
        let mut device_guard = device.lock().unwrap();
        (
            device_guard
                .create_buffer(BufferDesc {
                    name: "cube_verts".to_string(),
                    size: 288,
                    usage: BufferUsage::Vertex,
                    cpu_visible: false,
                })
                .unwrap(),
            device_guard
                .create_buffer(BufferDesc {
                    name: "cube_indices".to_string(),
                    size: 144,
                    usage: BufferUsage::Index,
                    cpu_visible: false,
                })
                .unwrap(),
        )
    };

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

    let material = {
        let mut device_guard = device.lock().unwrap();
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
        MaterialComponent {
            binding_group,
            ready: true,
        }
    };
    scene.set_material(entity, material);

    scene
        .entity_mut(entity)
        .unwrap()
        .transform
        .set_translation(position);
    scene.set_local_bounds(
        entity,
        BoundingBox::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
    );

    (scene, entity)
}

fn forward_camera() -> Camera {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    camera.set_view(Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y));
    camera
}

fn record(
    pass: &GBufferPass,
    scene: &Scene,
    selected: Option<crate::scene::EntityKey>,
) -> (u32, Vec<MockCommand>) {
    let (list, log) = MockGraphicsDevice::standalone_list();
    let drawn = {
        let mut list_guard = list.lock().unwrap();
        list_guard.begin().unwrap();
        let drawn = pass
            .record(
                &mut *list_guard,
                0,
                &forward_camera(),
                &scene.draw_items(),
                selected,
            )
            .unwrap();
        list_guard.end().unwrap();
        drawn
    };
    let entries = log.lock().unwrap().clone();
    (drawn, entries)
}

#[test]
fn test_renders_visible_cube() {
    let device = make_device();
    let pass = make_pass(&device);
    let (scene, _) = scene_with_cube(&device, Vec3::new(0.0, 0.0, -5.0));

    let (drawn, commands) = record(&pass, &scene, None);
    assert_eq!(drawn, 1);

    let draws = commands
        .iter()
        .filter(|c| matches!(c, MockCommand::DrawIndexed { .. }))
        .count();
    assert_eq!(draws, 1);
}

#[test]
fn test_culls_cube_behind_camera() {
    let device = make_device();
    let pass = make_pass(&device);
    let (scene, _) = scene_with_cube(&device, Vec3::new(0.0, 0.0, 50.0));

    let (drawn, commands) = record(&pass, &scene, None);
    assert_eq!(drawn, 0);
    assert!(!commands
        .iter()
        .any(|c| matches!(c, MockCommand::DrawIndexed { .. })));
}

#[test]
fn test_rendering_info_shape() {
    let device = make_device();
    let pass = make_pass(&device);
    let (scene, _) = scene_with_cube(&device, Vec3::new(0.0, 0.0, -5.0));

    let (_, commands) = record(&pass, &scene, None);

    let begin = commands
        .iter()
        .find_map(|c| match c {
            MockCommand::BeginRendering {
                extent,
                color_targets,
                color_load_ops,
                has_depth_stencil,
            } => Some((*extent, color_targets.clone(), color_load_ops.clone(), *has_depth_stencil)),
            _ => None,
        })
        .unwrap();

    assert_eq!(begin.0, (1280, 720));
    assert_eq!(begin.1.len(), 4);
    assert!(begin.1[0].starts_with("[GBuffer] Position"));
    assert!(begin.1[2].starts_with("[GBuffer] AlbedoSpec"));
    assert!(begin.2.iter().all(|op| *op == LoadOp::Clear));
    assert!(begin.3);
}

#[test]
fn test_stencil_gating_for_selection() {
    let device = make_device();
    let pass = make_pass(&device);
    let (scene, entity) = scene_with_cube(&device, Vec3::new(0.0, 0.0, -5.0));

    // Selected: reference 1, write mask 0xFF.
    let (_, commands) = record(&pass, &scene, Some(entity));
    assert!(commands.contains(&MockCommand::SetStencilReference(1)));
    assert!(commands.contains(&MockCommand::SetStencilWriteMask(0xFF)));

    // Not selected: reference 0, write mask 0.
    let (_, commands) = record(&pass, &scene, None);
    assert!(commands.contains(&MockCommand::SetStencilReference(0)));
    assert!(commands.contains(&MockCommand::SetStencilWriteMask(0x00)));
    assert!(!commands.contains(&MockCommand::SetStencilReference(1)));
}

#[test]
fn test_attachments_end_in_shader_read() {
    let device = make_device();
    let pass = make_pass(&device);
    let (scene, _) = scene_with_cube(&device, Vec3::new(0.0, 0.0, -5.0));

    let (_, commands) = record(&pass, &scene, None);

    let end_rendering = commands
        .iter()
        .position(|c| matches!(c, MockCommand::EndRendering))
        .unwrap();

    // After the pass: 4 colour + 1 depth transition to ShaderReadOnly.
    let read_transitions = commands[end_rendering..]
        .iter()
        .filter(|c| {
            matches!(c, MockCommand::ImageBarrier { new_layout: ImageLayout::ShaderReadOnly, .. })
        })
        .count();
    assert_eq!(read_transitions, 5);

    let depth_transition = commands[end_rendering..]
        .iter()
        .any(|c| matches!(c, MockCommand::ImageBarrier { texture, new_layout: ImageLayout::ShaderReadOnly, .. }
            if texture.starts_with("[GBuffer] DepthStencil")));
    assert!(depth_transition);
}

#[test]
fn test_push_constant_is_model_matrix() {
    let device = make_device();
    let pass = make_pass(&device);
    let position = Vec3::new(0.0, 1.0, -5.0);
    let (scene, _) = scene_with_cube(&device, position);

    let (_, commands) = record(&pass, &scene, None);

    let push = commands
        .iter()
        .find_map(|c| match c {
            MockCommand::PushConstants { data, stages } => Some((data.clone(), *stages)),
            _ => None,
        })
        .unwrap();

    assert_eq!(push.1, ShaderStageFlags::VERTEX);
    assert_eq!(push.0.len(), 64);
    let matrix: &[f32] = bytemuck::cast_slice(&push.0);
    // Translation column of the model matrix.
    assert_eq!(&matrix[12..15], &[0.0, 1.0, -5.0]);
}

#[test]
fn test_resize_recreates_targets() {
    let device = make_device();
    let mut pass = make_pass(&device);
    let depth_before = pass.depth_stencil_texture(0).bindless_index();

    {
        let mut device_guard = device.lock().unwrap();
        device_guard.resize(1920, 1080).unwrap();
        pass.resize(&mut *device_guard, 1920, 1080).unwrap();
    }

    assert_eq!(pass.extent(), (1920, 1080));
    assert_eq!(pass.depth_stencil_texture(0).desc().width, 1920);
    // New textures got fresh bindless slots.
    assert_ne!(
        pass.depth_stencil_texture(0).bindless_index(),
        depth_before
    );
}
