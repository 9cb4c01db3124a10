/// Frustum — six clipping planes for visibility culling.
///
/// Each plane is a Vec4 (A, B, C, D) where (A, B, C) is the
/// inward-pointing unit normal and D the signed distance. A point P is
/// inside when dot(plane, (P, 1)) >= 0 for all planes.

use glam::{Mat4, Vec3, Vec4};
use crate::accel::BoundingBox;

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Result of a three-way frustum/AABB classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    /// The box is fully inside the frustum
    Inside,
    /// The box is fully outside at least one plane
    Outside,
    /// The box straddles one or more planes
    Partial,
}

/// Six frustum planes for culling.
///
/// Works with both perspective and orthographic projections.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Uses the Gribb & Hartmann method; each plane is normalized so
    /// that (A, B, C) is a unit vector.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();

        let mut planes = [
            // Left:   row3 + row0
            Vec4::new(m[0][3] + m[0][0], m[1][3] + m[1][0], m[2][3] + m[2][0], m[3][3] + m[3][0]),
            // Right:  row3 - row0
            Vec4::new(m[0][3] - m[0][0], m[1][3] - m[1][0], m[2][3] - m[2][0], m[3][3] - m[3][0]),
            // Bottom: row3 + row1
            Vec4::new(m[0][3] + m[0][1], m[1][3] + m[1][1], m[2][3] + m[2][1], m[3][3] + m[3][1]),
            // Top:    row3 - row1
            Vec4::new(m[0][3] - m[0][1], m[1][3] - m[1][1], m[2][3] - m[2][1], m[3][3] - m[3][1]),
            // Near:   row3 + row2
            Vec4::new(m[0][3] + m[0][2], m[1][3] + m[1][2], m[2][3] + m[2][2], m[3][3] + m[3][2]),
            // Far:    row3 - row2
            Vec4::new(m[0][3] - m[0][2], m[1][3] - m[1][2], m[2][3] - m[2][2], m[3][3] - m[3][2]),
        ];

        for plane in &mut planes {
            let normal_len = Vec3::new(plane.x, plane.y, plane.z).length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Test if an AABB intersects this frustum.
    ///
    /// Positive-vertex test: conservative, may return false positives,
    /// never false negatives.
    pub fn intersects_aabb(&self, aabb: &BoundingBox) -> bool {
        self.classify_aabb(aabb) != FrustumTest::Outside
    }

    /// Three-way classification of an AABB against the frustum.
    ///
    /// For each plane, the corner most aligned with the plane normal
    /// (positive vertex) decides rejection; the opposite corner
    /// (negative vertex) decides full containment.
    pub fn classify_aabb(&self, aabb: &BoundingBox) -> FrustumTest {
        if !aabb.is_valid() {
            return FrustumTest::Outside;
        }

        let min = aabb.min();
        let max = aabb.max();
        let mut fully_inside = true;

        for plane in &self.planes {
            let normal = Vec3::new(plane.x, plane.y, plane.z);

            let p_vertex = Vec3::new(
                if normal.x >= 0.0 { max.x } else { min.x },
                if normal.y >= 0.0 { max.y } else { min.y },
                if normal.z >= 0.0 { max.z } else { min.z },
            );
            if normal.dot(p_vertex) + plane.w < 0.0 {
                return FrustumTest::Outside;
            }

            let n_vertex = Vec3::new(
                if normal.x >= 0.0 { min.x } else { max.x },
                if normal.y >= 0.0 { min.y } else { max.y },
                if normal.z >= 0.0 { min.z } else { max.z },
            );
            if normal.dot(n_vertex) + plane.w < 0.0 {
                fully_inside = false;
            }
        }

        if fully_inside {
            FrustumTest::Inside
        } else {
            FrustumTest::Partial
        }
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
