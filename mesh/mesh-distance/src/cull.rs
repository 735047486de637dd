//! Pruning of gathered facets that cannot be nearest to any query point.

use mesh_types::{Aabb, Facet};

/// Smallest worst-case distance from the query region to any facet, and
/// the facet that attains it.
///
/// Every point in `query_bounds` is within the returned distance of that
/// facet. Returns `None` for an empty facet set.
#[must_use]
pub fn cull_bound<F: Facet>(facets: &[F], query_bounds: &Aabb) -> Option<(f64, usize)> {
    facets
        .iter()
        .enumerate()
        .map(|(i, f)| (query_bounds.furthest_possible_distance(&f.extent()), i))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Indices (ascending) of the facets that may be nearest to some point in
/// `query_bounds`.
///
/// A facet is dropped when even its closest possible distance to the
/// region is no better than the bound from [`cull_bound`]; the facet
/// attaining that bound is always kept, so a non-empty input never culls
/// to nothing.
///
/// # Example
///
/// ```
/// use mesh_distance::cull;
/// use mesh_types::{Aabb, Point3, Segment};
///
/// let near = Segment::planar([0.0, -1.0], [1.0, -1.0]);
/// let far = Segment::planar([0.0, 100.0], [1.0, 100.0]);
/// let region = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0));
///
/// assert_eq!(cull(&[far, near], &region), vec![1]);
/// ```
#[must_use]
pub fn cull<F: Facet>(facets: &[F], query_bounds: &Aabb) -> Vec<usize> {
    let Some((bound, witness)) = cull_bound(facets, query_bounds) else {
        return Vec::new();
    };
    facets
        .iter()
        .enumerate()
        .filter(|&(i, f)| i == witness || query_bounds.closest_possible_distance(&f.extent()) < bound)
        .map(|(i, _)| i)
        .collect()
}
