//! Axis-aligned bounding boxes.

use glam::DVec3;

/// An axis-aligned bounding box with `min <= max` componentwise.
///
/// All containment and overlap predicates are inclusive at boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Create a box from two corners. The corners may be given in any
    /// order; components are sorted so the `min <= max` invariant holds.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box from a center point and full edge lengths.
    pub fn from_center_size(center: DVec3, size: DVec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// True when the box has strictly positive extent on every axis.
    pub fn has_volume(&self) -> bool {
        let size = self.size();
        size.x > 0.0 && size.y > 0.0 && size.z > 0.0
    }

    /// Point containment, inclusive of faces.
    pub fn contains(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Sphere overlap via the closest-point-distance test: true iff the
    /// sphere touches or penetrates the box.
    pub fn contains_sphere(&self, center: DVec3, radius: f64) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// Slab overlap on all three axes, inclusive of shared faces.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Midpoint split into the 8 child octants.
    ///
    /// Octant order follows the binary index convention: bit 0 selects the
    /// upper x half, bit 1 the upper y half, bit 2 the upper z half.
    pub fn octants(&self) -> [Aabb; 8] {
        let center = self.center();
        let mut result = [*self; 8];
        for (index, octant) in result.iter_mut().enumerate() {
            let mut min = self.min;
            let mut max = center;
            if index & 0b001 != 0 {
                min.x = center.x;
                max.x = self.max.x;
            }
            if index & 0b010 != 0 {
                min.y = center.y;
                max.y = self.max.y;
            }
            if index & 0b100 != 0 {
                min.z = center.z;
                max.z = self.max.z;
            }
            *octant = Aabb { min, max };
        }
        result
    }
}
