//! Traits shared by facet geometry.

use crate::Aabb;
use nalgebra::Point3;

/// A piece of queryable surface: anything that has a bounding extent and can
/// project a query point onto itself.
///
/// Spatial indices are generic over this trait, so the same tree serves
/// triangle walls in 3D and segment walls in 2D.
pub trait Facet: Copy {
    /// Axis-aligned bounding extent of the facet.
    fn extent(&self) -> Aabb;

    /// Centroid of the facet.
    fn centroid(&self) -> Point3<f64>;

    /// Nearest point on the facet to `query`.
    fn closest_point(&self, query: &Point3<f64>) -> Point3<f64>;

    /// Conservative overlap test against a box.
    ///
    /// May report overlap for boxes that only come close, but must never
    /// miss a box the facet actually touches. The default compares extents.
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.extent().intersects(aabb)
    }

    /// Euclidean distance from `query` to the facet.
    fn distance_to(&self, query: &Point3<f64>) -> f64 {
        (self.closest_point(query) - query).norm()
    }
}
