/// Tests for BoundingBox
///
/// Covers union identity on the invalid box, the 8-corner transform
/// (including the round-trip property), surface area, and the
/// half-open overlap convention.

use super::*;
use glam::{Mat4, Quat, Vec3};

fn make(min: (f32, f32, f32), max: (f32, f32, f32)) -> BoundingBox {
    BoundingBox::new(Vec3::from(min), Vec3::from(max))
}

#[test]
fn test_invalid_is_identity_for_union() {
    let a = make((-1.0, -1.0, -1.0), (1.0, 1.0, 1.0));
    let empty = BoundingBox::invalid();

    assert!(!empty.is_valid());
    assert_eq!(a.union(&empty), a);
    assert_eq!(empty.union(&a), a);
    assert!(!empty.union(&BoundingBox::invalid()).is_valid());
}

#[test]
fn test_union_encloses_both() {
    let a = make((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
    let b = make((2.0, -1.0, 0.5), (3.0, 0.5, 2.0));
    let u = a.union(&b);

    assert!(u.contains(&a));
    assert!(u.contains(&b));
    assert_eq!(u.min(), Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(u.max(), Vec3::new(3.0, 1.0, 2.0));
}

#[test]
fn test_surface_area() {
    let unit = make((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
    assert_eq!(unit.surface_area(), 6.0);

    let slab = make((0.0, 0.0, 0.0), (2.0, 1.0, 3.0));
    // 2 * (2*1 + 2*3 + 1*3) = 22
    assert_eq!(slab.surface_area(), 22.0);

    assert_eq!(BoundingBox::invalid().surface_area(), 0.0);
}

#[test]
fn test_from_points() {
    let b = BoundingBox::from_points(&[
        Vec3::new(1.0, 2.0, 3.0),
        Vec3::new(-1.0, 5.0, 0.0),
    ]);
    assert_eq!(b.min(), Vec3::new(-1.0, 2.0, 0.0));
    assert_eq!(b.max(), Vec3::new(1.0, 5.0, 3.0));

    assert!(!BoundingBox::from_points(&[]).is_valid());
}

#[test]
fn test_transform_translation() {
    let b = make((-1.0, -1.0, -1.0), (1.0, 1.0, 1.0));
    let t = Mat4::from_translation(Vec3::new(10.0, 0.0, -5.0));
    let moved = b.transformed(&t);

    assert_eq!(moved.min(), Vec3::new(9.0, -1.0, -6.0));
    assert_eq!(moved.max(), Vec3::new(11.0, 1.0, -4.0));
}

#[test]
fn test_transform_rotation_stays_tight() {
    // Rotating a unit cube 45 degrees about Y widens X/Z to sqrt(2).
    let b = make((-0.5, -0.5, -0.5), (0.5, 0.5, 0.5));
    let r = Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
    let rotated = b.transformed(&r);

    let half_diag = std::f32::consts::SQRT_2 * 0.5;
    assert!((rotated.max().x - half_diag).abs() < 1e-5);
    assert!((rotated.max().z - half_diag).abs() < 1e-5);
    assert!((rotated.max().y - 0.5).abs() < 1e-5);
}

#[test]
fn test_transform_round_trip() {
    // Identity up to floating tolerance for affine transforms that
    // keep the box axis-aligned (rotations re-box conservatively).
    let b = make((-2.0, 0.0, 1.0), (3.0, 4.0, 5.0));
    let m = Mat4::from_scale_rotation_translation(
        Vec3::new(2.0, 1.0, 0.5),
        Quat::IDENTITY,
        Vec3::new(1.0, -2.0, 3.0),
    );

    let round_trip = b.transformed(&m).transformed(&m.inverse());

    assert!((round_trip.min() - b.min()).length() < 1e-5);
    assert!((round_trip.max() - b.max()).length() < 1e-5);
}

#[test]
fn test_transform_identity_is_exact() {
    let b = make((-2.0, 0.0, 1.0), (3.0, 4.0, 5.0));
    let round_trip = b.transformed(&Mat4::IDENTITY);
    assert!((round_trip.min() - b.min()).length() < 1e-6);
    assert!((round_trip.max() - b.max()).length() < 1e-6);
}

#[test]
fn test_contains_point_half_open() {
    let b = make((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));

    assert!(b.contains_point(Vec3::ZERO));
    assert!(b.contains_point(Vec3::new(0.5, 0.5, 0.5)));
    // max corner is excluded
    assert!(!b.contains_point(Vec3::ONE));
    assert!(!b.contains_point(Vec3::new(0.5, 0.5, 1.0)));
}

#[test]
fn test_intersects_half_open() {
    let a = make((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
    let overlapping = make((0.5, 0.5, 0.5), (2.0, 2.0, 2.0));
    let touching = make((1.0, 0.0, 0.0), (2.0, 1.0, 1.0));
    let disjoint = make((5.0, 5.0, 5.0), (6.0, 6.0, 6.0));

    assert!(a.intersects(&overlapping));
    // face contact carries no interior volume
    assert!(!a.intersects(&touching));
    assert!(!a.intersects(&disjoint));
    assert!(!a.intersects(&BoundingBox::invalid()));
}

#[test]
fn test_contains() {
    let big = make((-10.0, -10.0, -10.0), (10.0, 10.0, 10.0));
    let small = make((-1.0, -1.0, -1.0), (1.0, 1.0, 1.0));
    let straddling = make((5.0, 5.0, 5.0), (15.0, 15.0, 15.0));

    assert!(big.contains(&small));
    assert!(!small.contains(&big));
    assert!(!big.contains(&straddling));
    assert!(!big.contains(&BoundingBox::invalid()));
}

#[test]
fn test_grow() {
    let mut b = BoundingBox::invalid();
    b.grow(Vec3::new(1.0, 1.0, 1.0));
    assert!(b.is_valid());
    assert_eq!(b.min(), b.max());

    b.grow(Vec3::new(-1.0, 2.0, 0.0));
    assert_eq!(b.min(), Vec3::new(-1.0, 1.0, 0.0));
    assert_eq!(b.max(), Vec3::new(1.0, 2.0, 1.0));
}
