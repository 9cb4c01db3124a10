/// Tests for Frustum
///
/// Uses a canonical camera at the origin looking down -Z.

use super::*;
use glam::{Mat4, Vec3};
use crate::accel::BoundingBox;

fn forward_vp() -> Mat4 {
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
    proj * view
}

fn make_aabb(min: (f32, f32, f32), max: (f32, f32, f32)) -> BoundingBox {
    BoundingBox::new(Vec3::from(min), Vec3::from(max))
}

#[test]
fn test_planes_are_normalized() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    for plane in &frustum.planes {
        let normal = Vec3::new(plane.x, plane.y, plane.z);
        assert!((normal.length() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_box_in_front_intersects() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    let in_front = make_aabb((-1.0, -1.0, -11.0), (1.0, 1.0, -9.0));
    assert!(frustum.intersects_aabb(&in_front));
    assert_eq!(frustum.classify_aabb(&in_front), FrustumTest::Inside);
}

#[test]
fn test_box_behind_is_outside() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    let behind = make_aabb((-1.0, -1.0, 9.0), (1.0, 1.0, 11.0));
    assert!(!frustum.intersects_aabb(&behind));
    assert_eq!(frustum.classify_aabb(&behind), FrustumTest::Outside);
}

#[test]
fn test_box_straddling_near_plane_is_partial() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    // Spans from behind the camera to in front: crosses the near plane.
    let straddling = make_aabb((-0.5, -0.5, -5.0), (0.5, 0.5, 5.0));
    assert_eq!(frustum.classify_aabb(&straddling), FrustumTest::Partial);
    assert!(frustum.intersects_aabb(&straddling));
}

#[test]
fn test_box_beyond_far_plane_is_outside() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    let beyond = make_aabb((-1.0, -1.0, -300.0), (1.0, 1.0, -200.0));
    assert_eq!(frustum.classify_aabb(&beyond), FrustumTest::Outside);
}

#[test]
fn test_box_off_to_the_side_is_outside() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    // 90 degree FOV at z = -10 covers x in [-10, 10].
    let off_side = make_aabb((30.0, -1.0, -11.0), (32.0, 1.0, -9.0));
    assert_eq!(frustum.classify_aabb(&off_side), FrustumTest::Outside);
}

#[test]
fn test_invalid_box_is_outside() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    assert_eq!(
        frustum.classify_aabb(&BoundingBox::invalid()),
        FrustumTest::Outside
    );
}

#[test]
fn test_huge_box_is_partial() {
    let frustum = Frustum::from_view_projection(&forward_vp());
    let huge = make_aabb((-1000.0, -1000.0, -1000.0), (1000.0, 1000.0, 1000.0));
    assert_eq!(frustum.classify_aabb(&huge), FrustumTest::Partial);
}
