/// Tests for the angular mapping
///
/// These pin the shared CPU/shader contract: unit-length directions,
/// octahedral round trips, normalization of the integration weights,
/// and the over-compositing algebra.

use super::*;
use glam::{Vec2, Vec3, Vec4};

#[test]
fn test_directions_2d_are_unit_and_distinct() {
    let q = 4;
    let count = q * q;
    for index in 0..count {
        let dir = direction_2d(index, q);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    // Adjacent indices advance by one equiangular step.
    let step = std::f32::consts::TAU / count as f32;
    let a = direction_2d(0, q);
    let b = direction_2d(1, q);
    assert!((a.angle_to(b).abs() - step).abs() < 1e-4);
}

#[test]
fn test_directions_2d_cover_the_circle() {
    let q = 4;
    let count = q * q;
    let sum: Vec2 = (0..count).map(|i| direction_2d(i, q)).sum();
    // Equiangular fans sum to zero.
    assert!(sum.length() < 1e-4);
}

#[test]
fn test_oct_round_trip() {
    let q = 8;
    for index in 0..q * q {
        let dir = direction_3d(index, q);
        assert!((dir.length() - 1.0).abs() < 1e-4);

        let uv = oct_encode(dir);
        let decoded = oct_decode(uv);
        assert!(
            (decoded - dir).length() < 1e-4,
            "round trip failed for index {}",
            index
        );
    }
}

#[test]
fn test_oct_decode_poles() {
    // Centre of the oct square is +Z, corners are -Z.
    let up = oct_decode(Vec2::new(0.5, 0.5));
    assert!((up - Vec3::Z).length() < 1e-5);

    let corner = oct_decode(Vec2::new(0.0, 0.0));
    assert!(corner.z < 0.0);
}

#[test]
fn test_direction_3d_tile_bijection() {
    // Distinct indices map to distinct directions.
    let q = 4;
    let dirs: Vec<Vec3> = (0..q * q).map(|i| direction_3d(i, q)).collect();
    for i in 0..dirs.len() {
        for j in (i + 1)..dirs.len() {
            assert!(
                (dirs[i] - dirs[j]).length() > 1e-4,
                "indices {} and {} collapsed",
                i,
                j
            );
        }
    }
}

#[test]
fn test_integrate_2d_constant_radiance() {
    let q = 4;
    let constant = Vec4::new(0.25, 0.5, 0.75, 1.0);
    let radiance = vec![constant; (q * q) as usize];

    let result = integrate_probe_2d(&radiance, q);
    assert!((result - Vec3::new(0.25, 0.5, 0.75)).length() < 1e-5);
}

#[test]
fn test_integrate_3d_constant_radiance_any_normal() {
    let q = 8;
    let constant = Vec4::new(2.0, 1.0, 0.5, 1.0);
    let radiance = vec![constant; (q * q) as usize];

    for normal in [
        Vec3::Y,
        Vec3::Z,
        -Vec3::X,
        Vec3::new(1.0, 1.0, 1.0).normalize(),
    ] {
        let result = integrate_probe_3d(&radiance, q, normal);
        assert!(
            (result - Vec3::new(2.0, 1.0, 0.5)).length() < 1e-4,
            "normal {:?} broke constancy",
            normal
        );
    }
}

#[test]
fn test_integrate_3d_rejects_backfacing_radiance() {
    let q = 8;
    let normal = Vec3::Y;
    // Light arrives only from directions below the hemisphere.
    let radiance: Vec<Vec4> = (0..q * q)
        .map(|i| {
            if direction_3d(i, q).dot(normal) < 0.0 {
                Vec4::new(5.0, 5.0, 5.0, 1.0)
            } else {
                Vec4::ZERO
            }
        })
        .collect();

    let result = integrate_probe_3d(&radiance, q, normal);
    assert!(result.length() < 1e-5);
}

#[test]
fn test_integrate_3d_emissive_patch_mirror_invariant() {
    // An emissive cone integrates identically when mirrored across the
    // normal plane: the stratified oct grid is symmetric under
    // x -> -x, and the cosine weight only sees d . n.
    let q = 16;
    let normal = Vec3::Y;

    let irradiance_for_axis = |reference: Vec3| {
        let radiance: Vec<Vec4> = (0..q * q)
            .map(|i| {
                let dir = direction_3d(i, q);
                // Cone of ~25 degrees about the reference axis
                if dir.dot(reference) > 0.9 {
                    Vec4::new(1.0, 1.0, 1.0, 1.0)
                } else {
                    Vec4::ZERO
                }
            })
            .collect();
        integrate_probe_3d(&radiance, q, normal)
    };

    let above = irradiance_for_axis(Vec3::Y);
    assert!(above.x > 0.0, "patch contributed nothing");
    assert!((above.x - above.y).abs() < 1e-6 && (above.y - above.z).abs() < 1e-6);

    let east = irradiance_for_axis(Vec3::X);
    let west = irradiance_for_axis(-Vec3::X);
    assert!((east - west).length() < 1e-6);
}

#[test]
fn test_merge_weight() {
    assert_eq!(merge_weight(1), 1.0);
    assert_eq!(merge_weight(2), 0.25);
    assert_eq!(merge_weight(4), 1.0 / 16.0);
}

#[test]
fn test_composite_over() {
    let near = Vec4::new(1.0, 0.0, 0.0, 0.5);
    let far = Vec4::new(0.0, 2.0, 0.0, 1.0);

    let merged = composite_over(near, far);
    // Far radiance passes scaled by near transmittance.
    assert!((merged - Vec4::new(1.0, 1.0, 0.0, 0.5)).length() < 1e-6);

    // Opaque near interval blocks the far one entirely.
    let opaque = Vec4::new(1.0, 1.0, 1.0, 0.0);
    let blocked = composite_over(opaque, far);
    assert!((blocked - Vec4::new(1.0, 1.0, 1.0, 0.0)).length() < 1e-6);
}

#[test]
fn test_composite_over_with_zero_radiance_stays_zero() {
    // Tracer + merger with no lights and no sky must stay all-zero.
    let empty = Vec4::new(0.0, 0.0, 0.0, 1.0);
    let merged = composite_over(empty, empty);
    assert_eq!(merged.truncate(), glam::Vec3::ZERO);
}
