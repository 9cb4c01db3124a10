/// Radiance texture layout — the (probe, direction) <-> texel
/// bijection.
///
/// 2D: probe (px, py) with tile edge q owns the q x q block at
/// `(px*q + dx, py*q + dy)`, direction index `d = dy*q + dx`.
///
/// 3D: probe (px, py, pz) owns the q x q block at
/// `(px*q + dx, pz*q + dz)` on array layer `py`, direction index
/// `d = dz*q + dx`.

use glam::{UVec2, UVec3};

// ===== 2D =====

/// Texel coordinate for a probe/direction pair.
pub fn texel_for_2d(probe: UVec2, direction: u32, q: u32) -> UVec2 {
    let dx = direction % q;
    let dy = direction / q;
    UVec2::new(probe.x * q + dx, probe.y * q + dy)
}

/// Inverse of `texel_for_2d`.
pub fn probe_direction_from_texel_2d(texel: UVec2, q: u32) -> (UVec2, u32) {
    let probe = UVec2::new(texel.x / q, texel.y / q);
    let dx = texel.x % q;
    let dy = texel.y % q;
    (probe, dy * q + dx)
}

// ===== 3D =====

/// (Texel coordinate, array layer) for a probe/direction pair.
pub fn texel_for_3d(probe: UVec3, direction: u32, q: u32) -> (UVec2, u32) {
    let dx = direction % q;
    let dz = direction / q;
    (
        UVec2::new(probe.x * q + dx, probe.z * q + dz),
        probe.y,
    )
}

/// Inverse of `texel_for_3d`.
pub fn probe_direction_from_texel_3d(texel: UVec2, layer: u32, q: u32) -> (UVec3, u32) {
    let probe = UVec3::new(texel.x / q, layer, texel.y / q);
    let dx = texel.x % q;
    let dz = texel.y % q;
    (probe, dz * q + dx)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
