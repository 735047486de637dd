//! Triangle facet with closest-point projection.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, Facet, Segment};

/// Relative padding applied to boxes in separating-axis tests.
///
/// Overlap tests must never report a false negative, so touching and
/// nearly-touching configurations are treated as overlapping.
const OVERLAP_TOLERANCE: f64 = 1e-10;

/// A triangle with concrete vertex positions.
///
/// Triangles are the facets of a wall surface. They are plain `Copy` values
/// and are never mutated once built.
///
/// # Example
///
/// ```
/// use mesh_types::{Facet, Point3, Triangle};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// );
///
/// let p = tri.closest_point(&Point3::new(0.25, 0.25, 3.0));
/// assert!((p.z - 0.0).abs() < 1e-12);
/// assert!((tri.area() - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f64>,
    /// Second vertex.
    pub v1: Point3<f64>,
    /// Third vertex.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Create a triangle from coordinate arrays.
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point3::new is not const in nalgebra
    pub fn from_arrays(v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> Self {
        Self {
            v0: Point3::from(v0),
            v1: Point3::from(v1),
            v2: Point3::from(v2),
        }
    }

    /// Vertex coordinates as plain arrays.
    #[inline]
    #[must_use]
    pub fn to_arrays(&self) -> [[f64; 3]; 3] {
        [self.v0.coords.into(), self.v1.coords.into(), self.v2.coords.into()]
    }

    /// Compute the (unnormalized) face normal via cross product.
    ///
    /// The magnitude equals twice the triangle's area.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the area of the triangle.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Get the three edges as segments, in order v0→v1, v1→v2, v2→v0.
    #[must_use]
    pub const fn edges(&self) -> [Segment; 3] {
        [
            Segment::new(self.v0, self.v1),
            Segment::new(self.v1, self.v2),
            Segment::new(self.v2, self.v0),
        ]
    }

    /// Get the length of the longest edge.
    #[inline]
    #[must_use]
    pub fn max_edge_length(&self) -> f64 {
        let [a, b, c] = self.edges().map(|e| e.length());
        a.max(b).max(c)
    }

    /// Check whether the triangle has (numerically) zero area.
    ///
    /// The test is scale-free: the cross product of two edges is compared
    /// against the square of the longest edge.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let longest = self.max_edge_length();
        let scale = longest * longest * f64::EPSILON;
        self.normal_unnormalized().norm_squared() <= scale * scale
    }

    /// Get vertices as an array.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Closest point of a non-degenerate triangle.
    ///
    /// Region-based projection from "Real-Time Collision Detection"
    /// (Ericson): classify the query against the vertex, edge and face
    /// Voronoi regions and project accordingly.
    fn closest_point_regular(&self, point: &Point3<f64>) -> Point3<f64> {
        let (v0, v1, v2) = (self.v0, self.v1, self.v2);
        let ab = v1 - v0;
        let ac = v2 - v0;
        let ap = point - v0;

        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return v0;
        }

        let bp = point - v1;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return v1;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return v0 + ab * v;
        }

        let cp = point - v2;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return v2;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return v0 + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return v1 + (v2 - v1) * w;
        }

        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        v0 + ab * v + ac * w
    }

    /// Closest point over the three edges; used when the face has no area.
    fn closest_point_on_edges(&self, point: &Point3<f64>) -> Point3<f64> {
        let mut best = self.v0;
        let mut best_sq = f64::INFINITY;
        for edge in self.edges() {
            let candidate = edge.closest_point(point);
            let d = (candidate - point).norm_squared();
            if d < best_sq {
                best_sq = d;
                best = candidate;
            }
        }
        best
    }
}

impl Facet for Triangle {
    fn extent(&self) -> Aabb {
        Aabb::from_points([self.v0, self.v1, self.v2].iter())
    }

    fn centroid(&self) -> Point3<f64> {
        Point3::new(
            (self.v0.x + self.v1.x + self.v2.x) / 3.0,
            (self.v0.y + self.v1.y + self.v2.y) / 3.0,
            (self.v0.z + self.v1.z + self.v2.z) / 3.0,
        )
    }

    /// Nearest point on the triangle to `query`.
    ///
    /// Degenerate triangles (collinear or coincident vertices) are projected
    /// onto their edges instead, which also covers the single-vertex case.
    fn closest_point(&self, query: &Point3<f64>) -> Point3<f64> {
        if self.is_degenerate() {
            self.closest_point_on_edges(query)
        } else {
            self.closest_point_regular(query)
        }
    }

    /// Separating-axis triangle/box overlap test (Akenine-Möller).
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() || !self.extent().intersects(&aabb.expanded(tolerance_for(aabb))) {
            return false;
        }
        let c = aabb.center();
        let half = aabb.size() * 0.5;
        let verts = [self.v0 - c, self.v1 - c, self.v2 - c];
        let tol = tolerance_for(aabb);

        let normal = self.normal_unnormalized();
        if separated_on_axis(&normal, &verts, &half, tol) {
            return false;
        }

        let edges = [verts[1] - verts[0], verts[2] - verts[1], verts[0] - verts[2]];
        for edge in &edges {
            for unit in [Vector3::x(), Vector3::y(), Vector3::z()] {
                if separated_on_axis(&unit.cross(edge), &verts, &half, tol) {
                    return false;
                }
            }
        }
        true
    }
}

/// Absolute padding for overlap tests against `aabb`.
pub(crate) fn tolerance_for(aabb: &Aabb) -> f64 {
    let scale = aabb.radius() + aabb.center().coords.amax();
    OVERLAP_TOLERANCE * (1.0 + scale)
}

/// Check whether `axis` separates the points from a box centered at the
/// origin with half-extents `half`.
pub(crate) fn separated_on_axis(
    axis: &Vector3<f64>,
    points: &[Vector3<f64>],
    half: &Vector3<f64>,
    tol: f64,
) -> bool {
    let len = axis.norm();
    if len == 0.0 {
        return false;
    }
    let r = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs() + tol * len;
    let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = axis.dot(p);
        (lo.min(d), hi.max(d))
    });
    lo > r || hi < -r
}
