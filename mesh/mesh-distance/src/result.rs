//! Result types for distance search.

use mesh_types::Point3;

use crate::diagnostics::SearchDiagnostics;
use crate::wire::FacetOwner;

/// Result of a distributed distance search on one rank.
///
/// All per-point arrays are indexed like the query points. A point that no
/// facet reached keeps the far-away sentinel as its projected point and
/// `None` as its metadata.
///
/// # Example
///
/// ```
/// use mesh_distance::{FacetOwner, SearchResult};
///
/// let result: SearchResult<FacetOwner> = SearchResult::default();
/// assert_eq!(result.unresolved_count(), 0);
/// assert!(!result.empty_input);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResult<M> {
    /// Distance from each query point to its nearest facet.
    pub distances: Vec<f64>,
    /// Nearest point on the surface for each query point.
    pub projected_points: Vec<Point3<f64>>,
    /// Metadata of the nearest facet, `None` if unresolved.
    pub metadata: Vec<Option<M>>,
    /// Accumulated search seconds per query point.
    pub search_cost: Vec<f64>,
    /// True when no rank supplied any facet; every point is unresolved.
    pub empty_input: bool,
    /// Aggregated timing and memory figures.
    pub diagnostics: SearchDiagnostics,
}

impl<M> Default for SearchResult<M> {
    fn default() -> Self {
        Self {
            distances: Vec::new(),
            projected_points: Vec::new(),
            metadata: Vec::new(),
            search_cost: Vec::new(),
            empty_input: false,
            diagnostics: SearchDiagnostics::default(),
        }
    }
}

impl<M> SearchResult<M> {
    /// Number of query points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// True when there were no query points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Whether point `index` found a facet.
    #[must_use]
    pub fn is_resolved(&self, index: usize) -> bool {
        self.metadata.get(index).is_some_and(Option::is_some)
    }

    /// Number of points that found no facet.
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.metadata.iter().filter(|m| m.is_none()).count()
    }

    /// Smallest distance, `None` without resolved points.
    #[must_use]
    pub fn min_distance(&self) -> Option<f64> {
        self.resolved_distances().reduce(f64::min)
    }

    /// Largest distance among resolved points.
    #[must_use]
    pub fn max_distance(&self) -> Option<f64> {
        self.resolved_distances().reduce(f64::max)
    }

    fn resolved_distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.distances
            .iter()
            .zip(&self.metadata)
            .filter(|(_, m)| m.is_some())
            .map(|(d, _)| *d)
    }
}

impl SearchResult<FacetOwner> {
    /// Boundary tag of each point's nearest facet.
    #[must_use]
    pub fn nearest_tags(&self) -> Vec<Option<i32>> {
        self.metadata.iter().map(|m| m.map(|o| o.tag)).collect()
    }

    /// Global id of each point's nearest facet.
    #[must_use]
    pub fn nearest_facets(&self) -> Vec<Option<i64>> {
        self.metadata.iter().map(|m| m.map(|o| o.global_id)).collect()
    }
}

impl<M> std::fmt::Display for SearchResult<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Wall Distance Search:")?;
        writeln!(f, "  Query points: {}", self.len())?;
        writeln!(f, "  Unresolved: {}", self.unresolved_count())?;
        if let (Some(min), Some(max)) = (self.min_distance(), self.max_distance()) {
            writeln!(f, "  Distance range: {min:.6} .. {max:.6}")?;
        }
        if self.empty_input {
            writeln!(f, "  (no surface facets found on any rank)")?;
        }
        Ok(())
    }
}

/// Result of a planar segment search on one rank.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanarResult {
    /// Distance from each query point to its nearest segment.
    pub distances: Vec<f64>,
    /// Nearest point on the segments for each query point.
    pub projected_points: Vec<Point3<f64>>,
    /// True when no rank supplied any segment.
    pub empty_input: bool,
}
