/// Tests for Camera

use super::*;
use glam::{Mat4, Vec3, Vec4};

#[test]
fn test_perspective_parameters() {
    let camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 16.0 / 9.0, 0.1, 100.0);
    assert_eq!(camera.fov_y(), std::f32::consts::FRAC_PI_2);
    assert_eq!(camera.aspect(), 16.0 / 9.0);
    assert_eq!(camera.near(), 0.1);
    assert_eq!(camera.far(), 100.0);
}

#[test]
fn test_view_projection_order() {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    camera.set_view(view);

    let expected = *camera.projection_matrix() * view;
    assert_eq!(camera.view_projection_matrix(), expected);
}

#[test]
fn test_frustum_follows_view() {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    camera.set_view(Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y));

    // A point straight ahead projects inside every plane.
    let ahead = Vec4::new(0.0, 0.0, -10.0, 1.0);
    for plane in &camera.frustum().planes {
        assert!(plane.dot(ahead) >= 0.0);
    }

    // Looking the other way flips the result.
    camera.set_view(Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::Y));
    let inside_all = camera
        .frustum()
        .planes
        .iter()
        .all(|plane| plane.dot(ahead) >= 0.0);
    assert!(!inside_all);
}

#[test]
fn test_set_aspect_refreshes_projection() {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    let before = *camera.projection_matrix();
    camera.set_aspect(2.0);
    assert_ne!(*camera.projection_matrix(), before);
    assert_eq!(camera.aspect(), 2.0);
}

#[test]
fn test_set_perspective_refreshes_everything() {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    camera.set_perspective(std::f32::consts::FRAC_PI_4, 1.5, 0.5, 50.0);
    assert_eq!(camera.fov_y(), std::f32::consts::FRAC_PI_4);
    assert_eq!(camera.far(), 50.0);
}
