//! Line segment facet, the boundary element of planar problems.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::triangle::{separated_on_axis, tolerance_for};
use crate::{Aabb, Facet};

/// A line segment between two points.
///
/// In two-dimensional problems the wall is a polyline and every edge is a
/// `Segment` lying in the `z = 0` plane; the type itself works in 3D.
///
/// # Example
///
/// ```
/// use mesh_types::{Facet, Point3, Segment};
///
/// let seg = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
/// let p = seg.closest_point(&Point3::new(5.0, 5.0, 0.0));
/// assert_eq!(p, Point3::new(5.0, 0.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Start point.
    pub a: Point3<f64>,
    /// End point.
    pub b: Point3<f64>,
}

impl Segment {
    /// Create a segment from its endpoints.
    #[inline]
    #[must_use]
    pub const fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self { a, b }
    }

    /// Create a segment in the `z = 0` plane from 2D coordinates.
    #[inline]
    #[must_use]
    pub fn planar(a: [f64; 2], b: [f64; 2]) -> Self {
        Self::new(Point3::new(a[0], a[1], 0.0), Point3::new(b[0], b[1], 0.0))
    }

    /// Direction vector from `a` to `b` (not normalized).
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Vector3<f64> {
        self.b - self.a
    }

    /// Segment length.
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }
}

impl Facet for Segment {
    fn extent(&self) -> Aabb {
        Aabb::new(self.a, self.b)
    }

    fn centroid(&self) -> Point3<f64> {
        nalgebra::center(&self.a, &self.b)
    }

    /// Clamp-projection onto the segment. A zero-length segment returns `a`.
    fn closest_point(&self, query: &Point3<f64>) -> Point3<f64> {
        let ab = self.direction();
        let len_sq = ab.norm_squared();
        if len_sq == 0.0 {
            return self.a;
        }
        let t = ((query - self.a).dot(&ab) / len_sq).clamp(0.0, 1.0);
        self.a + ab * t
    }

    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let tol = tolerance_for(aabb);
        if aabb.is_empty() || !self.extent().intersects(&aabb.expanded(tol)) {
            return false;
        }
        let c = aabb.center();
        let half = aabb.size() * 0.5;
        let points = [self.a - c, self.b - c];
        let d = self.direction();
        ![Vector3::x(), Vector3::y(), Vector3::z()]
            .iter()
            .any(|unit| separated_on_axis(&unit.cross(&d), &points, &half, tol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn closest_point_clamps_to_endpoints() {
        let seg = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
        assert_eq!(seg.closest_point(&Point3::new(-5.0, 0.0, 0.0)), seg.a);
        assert_eq!(seg.closest_point(&Point3::new(15.0, 3.0, 0.0)), seg.b);
    }

    #[test]
    fn zero_length_segment() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let seg = Segment::new(p, p);
        assert_eq!(seg.closest_point(&Point3::origin()), p);
        assert_relative_eq!(seg.length(), 0.0);
    }

    #[test]
    fn planar_constructor_sets_z_zero() {
        let seg = Segment::planar([1.0, 2.0], [3.0, 4.0]);
        assert_relative_eq!(seg.a.z, 0.0);
        assert_relative_eq!(seg.b.z, 0.0);
        assert_relative_eq!(seg.centroid().x, 2.0);
    }

    #[test]
    fn diagonal_segment_misses_corner_box() {
        let seg = Segment::planar([0.0, 0.0], [1.0, 1.0]);
        let corner = Aabb::new(Point3::new(0.7, 0.0, -0.1), Point3::new(1.0, 0.2, 0.1));
        assert!(seg.extent().intersects(&corner));
        assert!(!seg.intersects_aabb(&corner));

        let crossing = Aabb::new(Point3::new(0.4, 0.4, -0.1), Point3::new(0.6, 0.6, 0.1));
        assert!(seg.intersects_aabb(&crossing));
    }
}
