/// Tests for the radiance texture layout
///
/// The (probe, direction) -> texel mapping must be a bijection over
/// the whole texture in both variants.

use super::*;
use glam::{UVec2, UVec3};
use rustc_hash::FxHashSet;

#[test]
fn test_2d_round_trip() {
    let q = 4;
    let dims = UVec2::new(8, 6);

    for py in 0..dims.y {
        for px in 0..dims.x {
            for direction in 0..q * q {
                let probe = UVec2::new(px, py);
                let texel = texel_for_2d(probe, direction, q);
                let (probe_back, direction_back) = probe_direction_from_texel_2d(texel, q);
                assert_eq!(probe_back, probe);
                assert_eq!(direction_back, direction);
            }
        }
    }
}

#[test]
fn test_2d_is_bijective_over_texture() {
    let q = 4;
    let dims = UVec2::new(5, 3);

    let mut seen = FxHashSet::default();
    for py in 0..dims.y {
        for px in 0..dims.x {
            for direction in 0..q * q {
                let texel = texel_for_2d(UVec2::new(px, py), direction, q);
                assert!(texel.x < dims.x * q && texel.y < dims.y * q);
                assert!(seen.insert((texel.x, texel.y)), "texel {:?} reused", texel);
            }
        }
    }
    assert_eq!(seen.len(), (dims.x * q * dims.y * q) as usize);
}

#[test]
fn test_2d_tile_is_contiguous() {
    // All directions of one probe land in its q x q block.
    let q = 8;
    let probe = UVec2::new(3, 2);
    for direction in 0..q * q {
        let texel = texel_for_2d(probe, direction, q);
        assert!(texel.x >= probe.x * q && texel.x < (probe.x + 1) * q);
        assert!(texel.y >= probe.y * q && texel.y < (probe.y + 1) * q);
    }
}

#[test]
fn test_3d_round_trip() {
    let q = 4;
    let dims = UVec3::new(4, 3, 5);

    for pz in 0..dims.z {
        for py in 0..dims.y {
            for px in 0..dims.x {
                for direction in 0..q * q {
                    let probe = UVec3::new(px, py, pz);
                    let (texel, layer) = texel_for_3d(probe, direction, q);
                    let (probe_back, direction_back) =
                        probe_direction_from_texel_3d(texel, layer, q);
                    assert_eq!(probe_back, probe);
                    assert_eq!(direction_back, direction);
                }
            }
        }
    }
}

#[test]
fn test_3d_layer_is_probe_y() {
    let q = 2;
    let probe = UVec3::new(1, 7, 3);
    let (_, layer) = texel_for_3d(probe, 0, q);
    assert_eq!(layer, 7);
}

#[test]
fn test_3d_is_bijective_over_texture() {
    let q = 2;
    let dims = UVec3::new(3, 2, 4);

    let mut seen = FxHashSet::default();
    for pz in 0..dims.z {
        for py in 0..dims.y {
            for px in 0..dims.x {
                for direction in 0..q * q {
                    let (texel, layer) = texel_for_3d(UVec3::new(px, py, pz), direction, q);
                    assert!(seen.insert((texel.x, texel.y, layer)));
                }
            }
        }
    }
    assert_eq!(seen.len(), (dims.x * q * dims.z * q * dims.y) as usize);
}
