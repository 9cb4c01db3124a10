/// BoundingBox — axis-aligned bounding box with a validity bit.
///
/// The invalid state represents "no volume yet" (an empty union).
/// Whenever valid, `min <= max` holds componentwise. Overlap and
/// point-containment tests are half-open on each axis: a box covers
/// `[min, max)`.

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in world or local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
    valid: bool,
}

impl BoundingBox {
    /// Create a box from its two corners.
    ///
    /// Debug-asserts `min <= max` componentwise.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "BoundingBox corners inverted: min={:?} max={:?}",
            min,
            max
        );
        Self { min, max, valid: true }
    }

    /// Create the invalid (empty) box. Union with any valid box
    /// yields that box.
    pub fn invalid() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
            valid: false,
        }
    }

    /// Smallest box enclosing a set of points. Empty input yields the
    /// invalid box.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut result = Self::invalid();
        for p in points {
            result.grow(*p);
        }
        result
    }

    /// Whether this box holds a volume.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Minimum corner. Meaningless on an invalid box.
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner. Meaningless on an invalid box.
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Componentwise extent (max - min).
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area: 2(wh + wd + hd). Zero for an invalid box.
    pub fn surface_area(&self) -> f32 {
        if !self.valid {
            return 0.0;
        }
        let e = self.extent();
        2.0 * (e.x * e.y + e.x * e.z + e.y * e.z)
    }

    /// Expand to enclose a point.
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
        self.valid = true;
    }

    /// Smallest box enclosing both operands. Invalid operands are
    /// identity elements.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        match (self.valid, other.valid) {
            (false, false) => Self::invalid(),
            (true, false) => *self,
            (false, true) => *other,
            (true, true) => Self {
                min: self.min.min(other.min),
                max: self.max.max(other.max),
                valid: true,
            },
        }
    }

    /// One of the box's eight corners, selected by the low three bits
    /// of `octant` (bit 0 = x, bit 1 = y, bit 2 = z; set = max side).
    fn corner(&self, octant: u32) -> Vec3 {
        Vec3::new(
            if octant & 1 != 0 { self.max.x } else { self.min.x },
            if octant & 2 != 0 { self.max.y } else { self.min.y },
            if octant & 4 != 0 { self.max.z } else { self.min.z },
        )
    }

    /// Transform this box by a matrix, returning the exact AABB of the
    /// transformed OBB.
    ///
    /// All eight corners are transformed and re-boxed; exact for
    /// affine matrices. An invalid box stays invalid.
    pub fn transformed(&self, matrix: &Mat4) -> BoundingBox {
        if !self.valid {
            return *self;
        }

        let mut result = Self::invalid();
        for octant in 0..8 {
            result.grow(matrix.transform_point3(self.corner(octant)));
        }
        result
    }

    /// Half-open point containment: `min <= p < max` on every axis.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.valid && self.min.cmple(p).all() && p.cmplt(self.max).all()
    }

    /// Test if this box fully contains another box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        self.min.cmple(other.min).all() && other.max.cmple(self.max).all()
    }

    /// Half-open overlap test: the boxes share interior volume on
    /// every axis. Touching faces do not overlap.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
#[path = "bounding_box_tests.rs"]
mod tests;
