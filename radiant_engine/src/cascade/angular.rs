/// Angular mapping — the one place direction indices become vectors.
///
/// The tracer, merger, and irradiance integrator all derive ray
/// directions from `(direction_index, q)` through these functions; the
/// shaders implement the same mapping by contract, so the CPU tests
/// here pin the behaviour for all of them.
///
/// 2D: `q^2` equiangular directions on the unit circle.
/// 3D: `q^2` directions from a stratified octahedral mapping of the
/// unit sphere (tile coordinate -> oct uv -> unit vector).

use glam::{Vec2, Vec3, Vec4};

// ===== 2D =====

/// Unit direction for `index` of a probe with tile edge `q`.
///
/// Directions are equiangular over the full circle, offset by half a
/// step so no ray lies exactly on an axis.
pub fn direction_2d(index: u32, q: u32) -> Vec2 {
    let count = (q * q) as f32;
    let angle = std::f32::consts::TAU * (index as f32 + 0.5) / count;
    Vec2::new(angle.cos(), angle.sin())
}

/// Average radiance over all of a probe's directions (flatland
/// fluence). Returns rgb; alpha is ignored.
pub fn integrate_probe_2d(radiance: &[Vec4], q: u32) -> Vec3 {
    let count = (q * q) as usize;
    debug_assert_eq!(radiance.len(), count);
    let sum: Vec3 = radiance.iter().map(|r| r.truncate()).sum();
    sum / count as f32
}

// ===== 3D =====

/// Map an octahedral uv in [0, 1)^2 to a unit sphere direction.
pub fn oct_decode(uv: Vec2) -> Vec3 {
    // To [-1, 1]^2
    let f = uv * 2.0 - Vec2::ONE;
    let mut n = Vec3::new(f.x, f.y, 1.0 - f.x.abs() - f.y.abs());
    if n.z < 0.0 {
        let x = (1.0 - n.y.abs()) * n.x.signum();
        let y = (1.0 - n.x.abs()) * n.y.signum();
        n.x = x;
        n.y = y;
    }
    n.normalize()
}

/// Inverse of `oct_decode`, returning uv in [0, 1]^2.
pub fn oct_encode(direction: Vec3) -> Vec2 {
    let n = direction / (direction.x.abs() + direction.y.abs() + direction.z.abs());
    let p = if n.z >= 0.0 {
        Vec2::new(n.x, n.y)
    } else {
        Vec2::new(
            (1.0 - n.y.abs()) * n.x.signum(),
            (1.0 - n.x.abs()) * n.y.signum(),
        )
    };
    (p + Vec2::ONE) * 0.5
}

/// Unit direction for `index` of a probe with tile edge `q`.
///
/// The index decomposes into a tile coordinate `(index % q, index / q)`
/// whose cell centre is pushed through the octahedral mapping; all
/// levels use the same mapping scaled to their own q.
pub fn direction_3d(index: u32, q: u32) -> Vec3 {
    let tile_x = index % q;
    let tile_y = index / q;
    let uv = Vec2::new(
        (tile_x as f32 + 0.5) / q as f32,
        (tile_y as f32 + 0.5) / q as f32,
    );
    oct_decode(uv)
}

/// Cosine-weighted hemispherical integration of a probe's directions
/// around `normal`.
///
/// Weights are `max(0, d . n)`, normalized so a constant radiance C
/// integrates to exactly C regardless of the normal or q.
pub fn integrate_probe_3d(radiance: &[Vec4], q: u32, normal: Vec3) -> Vec3 {
    let count = (q * q) as usize;
    debug_assert_eq!(radiance.len(), count);

    let mut sum = Vec3::ZERO;
    let mut weight_sum = 0.0f32;
    for (index, r) in radiance.iter().enumerate() {
        let weight = direction_3d(index as u32, q).dot(normal).max(0.0);
        sum += r.truncate() * weight;
        weight_sum += weight;
    }

    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        Vec3::ZERO
    }
}

// ===== MERGING =====

/// Weight applied to each coarse direction when folding a group of
/// `ratio^2` coarse directions into one fine direction (box filter
/// over the aligned tile block).
pub fn merge_weight(angular_ratio: u32) -> f32 {
    1.0 / (angular_ratio * angular_ratio) as f32
}

/// Composite a nearer interval over a farther one.
///
/// Alpha stores the visibility weight of the interval: radiance from
/// the far interval passes through scaled by the near transmittance,
/// and transmittances multiply.
pub fn composite_over(near: Vec4, far: Vec4) -> Vec4 {
    let rgb = near.truncate() + far.truncate() * near.w;
    Vec4::new(rgb.x, rgb.y, rgb.z, near.w * far.w)
}

#[cfg(test)]
#[path = "angular_tests.rs"]
mod tests;
