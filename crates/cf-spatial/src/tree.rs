//! Distance tree: an octree (or quadtree) over facets answering
//! nearest-point queries by best-first branch and bound.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::ops::Range;

use mesh_types::{Aabb, Facet};
use nalgebra::Point3;
use tracing::debug;

use crate::error::SpatialError;
use crate::voxel::{Dimension, NO_VOXEL, Voxel, child_extent};

/// Arena id of the root voxel.
const ROOT: usize = 0;

/// Margin applied to the isotropic domain extent when building the root.
pub const ROOT_SCALE: f64 = 1.001;

/// Deepest subdivision accepted by [`TreeParams::validate`].
pub const MAX_TREE_DEPTH: u32 = 21;

/// Parameters controlling how the tree subdivides.
///
/// # Example
///
/// ```
/// use cf_spatial::{Dimension, TreeParams};
///
/// let params = TreeParams::new()
///     .with_max_depth(6)
///     .with_max_objects_per_voxel(4)
///     .with_dimension(Dimension::Planar);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeParams {
    /// Voxels at this depth never split.
    pub max_depth: u32,
    /// A leaf splits once it holds more occupants than this.
    pub max_objects_per_voxel: usize,
    /// Octree or planar quadtree subdivision.
    pub dimension: Dimension,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_objects_per_voxel: 20,
            dimension: Dimension::Volume,
        }
    }
}

impl TreeParams {
    /// Default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the split threshold.
    #[must_use]
    pub const fn with_max_objects_per_voxel(mut self, max_objects: usize) -> Self {
        self.max_objects_per_voxel = max_objects;
        self
    }

    /// Set the subdivision dimension.
    #[must_use]
    pub const fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = dimension;
        self
    }

    /// Check that the parameters describe a usable tree.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidParameter`] if `max_objects_per_voxel`
    /// is zero or `max_depth` exceeds [`MAX_TREE_DEPTH`].
    pub fn validate(&self) -> Result<(), SpatialError> {
        if self.max_objects_per_voxel == 0 {
            return Err(SpatialError::InvalidParameter(
                "max_objects_per_voxel must be at least 1".to_string(),
            ));
        }
        if self.max_depth > MAX_TREE_DEPTH {
            return Err(SpatialError::InvalidParameter(format!(
                "max_depth {} exceeds {MAX_TREE_DEPTH}",
                self.max_depth
            )));
        }
        Ok(())
    }
}

/// Result of a nearest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// Nearest point found (the incumbent if nothing closer was found).
    pub point: Point3<f64>,
    /// Distance from the query to `point`.
    pub distance: f64,
    /// Index of the facet that produced `point`, `None` if the incumbent
    /// was not improved.
    pub index: Option<usize>,
}

impl NearestHit {
    /// True when a facet beat the incumbent.
    #[must_use]
    pub const fn improved(&self) -> bool {
        self.index.is_some()
    }
}

/// Shape summary of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TreeStatistics {
    /// Voxels in the arena.
    pub voxel_count: usize,
    /// Voxels without children.
    pub leaf_count: usize,
    /// Occupants of the fullest leaf.
    pub max_leaf_occupancy: usize,
    /// Mean occupants per leaf.
    pub mean_leaf_occupancy: f64,
    /// Leaves holding more than `max_objects_per_voxel` occupants.
    pub overfull_leaves: usize,
    /// Depth of the deepest voxel.
    pub deepest_level: u32,
    /// Total facet references across leaves (facets may repeat).
    pub stored_references: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    bound: f64,
    voxel: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then_with(|| self.voxel.cmp(&other.voxel))
    }
}

/// Spatial index over a borrowed slice of facets.
///
/// Facets are registered in every leaf voxel they overlap (exact
/// [`Facet::intersects_aabb`] test), so a facet may be referenced by several
/// leaves. After [`finalize`](Self::finalize) the tree is read-only: empty
/// children are pruned, every voxel extent is contracted to the part of its
/// contents it actually covers, and leaf lists are packed into one array.
///
/// # Example
///
/// ```
/// use cf_spatial::{DistanceTree, TreeParams};
/// use mesh_types::{Point3, Triangle};
///
/// let facets = vec![
///     Triangle::new(
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ),
///     Triangle::new(
///         Point3::new(5.0, 5.0, 5.0),
///         Point3::new(6.0, 5.0, 5.0),
///         Point3::new(5.0, 6.0, 5.0),
///     ),
/// ];
/// let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
///
/// let hit = tree.closest_point(&Point3::new(0.2, 0.2, 3.0)).unwrap();
/// assert_eq!(hit.index, Some(0));
/// assert!((hit.distance - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceTree<'a, F> {
    facets: &'a [F],
    extents: Vec<Aabb>,
    params: TreeParams,
    voxels: Vec<Voxel>,
    // Build state, released by finalize.
    filled: Vec<bool>,
    occupants: Vec<Vec<usize>>,
    blocked_at: Vec<usize>,
    // Packed leaf lists, populated by finalize.
    leaf_spans: Vec<Range<usize>>,
    leaf_items: Vec<usize>,
    deepest: u32,
    finalized: bool,
}

impl<'a, F: Facet> DistanceTree<'a, F> {
    /// Create an empty tree whose root covers `root_extent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` are invalid or `root_extent` is empty or
    /// not finite.
    pub fn new(facets: &'a [F], root_extent: Aabb, params: TreeParams) -> Result<Self, SpatialError> {
        params.validate()?;
        if root_extent.is_empty() || !root_extent.is_finite() {
            return Err(SpatialError::InvalidExtent);
        }
        let mut tree = Self::unrooted(facets, params);
        tree.push_voxel(Voxel::root(root_extent))?;
        Ok(tree)
    }

    fn unrooted(facets: &'a [F], params: TreeParams) -> Self {
        Self {
            facets,
            extents: facets.iter().map(Facet::extent).collect(),
            params,
            voxels: Vec::new(),
            filled: Vec::new(),
            occupants: Vec::new(),
            blocked_at: Vec::new(),
            leaf_spans: Vec::new(),
            leaf_items: Vec::new(),
            deepest: 0,
            finalized: false,
        }
    }

    /// Build and finalize a tree over every facet.
    ///
    /// The root is the bounding box of all facets, made cubic and enlarged
    /// by [`ROOT_SCALE`]. Facets whose extent is not finite are skipped. An
    /// empty slice yields an empty tree whose queries return the incumbent.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` are invalid.
    pub fn build(facets: &'a [F], params: TreeParams) -> Result<Self, SpatialError> {
        params.validate()?;
        let mut tree = Self::unrooted(facets, params);

        let usable: Vec<bool> = facets
            .iter()
            .zip(&tree.extents)
            .map(|(f, e)| e.is_finite() && f.centroid().coords.iter().all(|c| c.is_finite()))
            .collect();
        let domain = tree
            .extents
            .iter()
            .zip(&usable)
            .filter(|&(_, &ok)| ok)
            .fold(Aabb::empty(), |acc, (e, _)| acc.union(e));
        if domain.is_empty() {
            tree.finalized = true;
            debug!(facets = facets.len(), "No finite facets, tree is empty");
            return Ok(tree);
        }

        tree.push_voxel(Voxel::root(domain.isotropic().scaled(ROOT_SCALE)))?;

        let mut skipped = 0_usize;
        for (index, &ok) in usable.iter().enumerate() {
            if ok {
                tree.insert_into(ROOT, index)?;
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!(skipped, "Skipped facets with non-finite coordinates");
        }

        tree.finalize()?;

        let stats = tree.statistics();
        debug!(
            facets = facets.len(),
            voxels = stats.voxel_count,
            leaves = stats.leaf_count,
            depth = stats.deepest_level,
            max_leaf = stats.max_leaf_occupancy,
            "Built distance tree"
        );
        Ok(tree)
    }

    /// Register facet `index` in every leaf it overlaps, splitting leaves
    /// that become over-full.
    ///
    /// # Errors
    ///
    /// - [`SpatialError::Finalized`] once the tree is finalized
    /// - [`SpatialError::IndexOutOfRange`] for a bad index
    /// - [`SpatialError::OutsideRoot`] if the facet misses the root voxel
    pub fn insert(&mut self, index: usize) -> Result<(), SpatialError> {
        if self.finalized {
            return Err(SpatialError::Finalized);
        }
        let Some(facet) = self.facets.get(index) else {
            return Err(SpatialError::IndexOutOfRange {
                index,
                len: self.facets.len(),
            });
        };
        if !facet.intersects_aabb(&self.voxels[ROOT].extent) {
            return Err(SpatialError::OutsideRoot { index });
        }
        self.insert_into(ROOT, index)
    }

    /// Freeze the tree: prune empty children, contract extents and pack the
    /// leaf lists.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Finalized`] if called twice.
    pub fn finalize(&mut self) -> Result<(), SpatialError> {
        if self.finalized {
            return Err(SpatialError::Finalized);
        }
        self.finalized = true;
        if self.voxels.is_empty() {
            return Ok(());
        }

        for id in 0..self.voxels.len() {
            for slot in &mut self.voxels[id].children {
                if let Ok(child) = usize::try_from(*slot) {
                    if !self.filled[child] {
                        *slot = NO_VOXEL;
                    }
                }
            }
        }

        self.contract(ROOT);

        let mut spans = Vec::with_capacity(self.voxels.len());
        let mut items = Vec::new();
        for (voxel, occupants) in self.voxels.iter().zip(&self.occupants) {
            let start = items.len();
            if voxel.is_leaf() {
                items.extend_from_slice(occupants);
            }
            spans.push(start..items.len());
        }
        self.leaf_spans = spans;
        self.leaf_items = items;

        self.filled = Vec::new();
        self.occupants = Vec::new();
        self.blocked_at = Vec::new();
        Ok(())
    }

    /// Nearest point on any stored facet, seeded with a known candidate.
    ///
    /// Voxels are visited in order of their distance to `query`, and a voxel
    /// is skipped unless that distance is strictly below the best distance
    /// so far. The returned hit carries `index: None` when no facet is
    /// strictly closer than `incumbent`.
    #[must_use]
    pub fn closest_point_and_index(&self, query: &Point3<f64>, incumbent: &Point3<f64>) -> NearestHit {
        let seed = NearestHit {
            point: *incumbent,
            distance: (incumbent - query).norm(),
            index: None,
        };
        self.search(query, seed)
    }

    /// Nearest point on any stored facet, or `None` for an empty tree.
    #[must_use]
    pub fn closest_point(&self, query: &Point3<f64>) -> Option<NearestHit> {
        let seed = NearestHit {
            point: *query,
            distance: f64::INFINITY,
            index: None,
        };
        let hit = self.search(query, seed);
        hit.improved().then_some(hit)
    }

    fn search(&self, query: &Point3<f64>, mut best: NearestHit) -> NearestHit {
        if self.voxels.is_empty() {
            return best;
        }

        let mut queue = BinaryHeap::new();
        queue.push(Reverse(Candidate {
            bound: self.voxels[ROOT].extent.distance_to_point(query),
            voxel: ROOT,
        }));

        while let Some(Reverse(Candidate { bound, voxel })) = queue.pop() {
            if bound >= best.distance {
                break;
            }
            let v = &self.voxels[voxel];
            if v.is_leaf() {
                for &index in self.leaf_occupants(voxel) {
                    let point = self.facets[index].closest_point(query);
                    let distance = (point - query).norm();
                    if distance < best.distance {
                        best = NearestHit {
                            point,
                            distance,
                            index: Some(index),
                        };
                    }
                }
            } else {
                for child in v.child_ids() {
                    let bound = self.voxels[child].extent.distance_to_point(query);
                    if bound < best.distance {
                        queue.push(Reverse(Candidate { bound, voxel: child }));
                    }
                }
            }
        }
        best
    }

    /// Facet indices stored in `voxel` (empty for interior voxels).
    #[must_use]
    pub fn leaf_occupants(&self, voxel: usize) -> &[usize] {
        if self.finalized {
            self.leaf_spans
                .get(voxel)
                .map_or(&[], |span| &self.leaf_items[span.clone()])
        } else {
            self.occupants.get(voxel).map_or(&[], Vec::as_slice)
        }
    }

    /// The voxel arena; the root is element 0.
    #[must_use]
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Number of voxels.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Number of facets backing the tree.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    /// True when the tree has no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// True once [`finalize`](Self::finalize) has run.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Parameters the tree was built with.
    #[must_use]
    pub const fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Extents of all leaves, in arena order.
    #[must_use]
    pub fn leaf_extents(&self) -> Vec<Aabb> {
        self.voxels
            .iter()
            .filter(|v| v.is_leaf())
            .map(|v| v.extent)
            .collect()
    }

    /// Summarize the tree's shape.
    #[must_use]
    pub fn statistics(&self) -> TreeStatistics {
        let mut stats = TreeStatistics {
            voxel_count: self.voxels.len(),
            deepest_level: self.deepest,
            ..TreeStatistics::default()
        };
        for (id, voxel) in self.voxels.iter().enumerate() {
            if !voxel.is_leaf() {
                continue;
            }
            let occupancy = self.leaf_occupants(id).len();
            stats.leaf_count += 1;
            stats.stored_references += occupancy;
            stats.max_leaf_occupancy = stats.max_leaf_occupancy.max(occupancy);
            if occupancy > self.params.max_objects_per_voxel {
                stats.overfull_leaves += 1;
            }
        }
        if stats.leaf_count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let mean = stats.stored_references as f64 / stats.leaf_count as f64;
            stats.mean_leaf_occupancy = mean;
        }
        stats
    }

    fn push_voxel(&mut self, voxel: Voxel) -> Result<i32, SpatialError> {
        let id = i32::try_from(self.voxels.len())
            .map_err(|_| SpatialError::CapacityExceeded(self.voxels.len()))?;
        self.deepest = self.deepest.max(voxel.depth);
        self.voxels.push(voxel);
        self.filled.push(false);
        self.occupants.push(Vec::new());
        self.blocked_at.push(0);
        Ok(id)
    }

    fn insert_into(&mut self, voxel: usize, index: usize) -> Result<(), SpatialError> {
        let facets = self.facets;
        if !facets[index].intersects_aabb(&self.voxels[voxel].extent) {
            return Ok(());
        }
        self.filled[voxel] = true;

        let node = self.voxels[voxel];
        if !node.is_leaf() {
            for child in node.child_ids() {
                self.insert_into(child, index)?;
            }
            return Ok(());
        }

        self.occupants[voxel].push(index);
        let count = self.occupants[voxel].len();
        let blocked = self.blocked_at[voxel];
        if node.depth < self.params.max_depth
            && count > self.params.max_objects_per_voxel
            && (blocked == 0 || count > 2 * blocked)
        {
            self.split(voxel)?;
        }
        Ok(())
    }

    /// Turn a leaf into an interior voxel and redistribute its occupants.
    ///
    /// A split that would leave two or more children holding every occupant
    /// cannot separate them (coincident or fanned facets), so the leaf is
    /// kept and retried once its occupancy has doubled.
    fn split(&mut self, voxel: usize) -> Result<(), SpatialError> {
        let facets = self.facets;
        let node = self.voxels[voxel];
        let slots = self.params.dimension.child_count();
        let child_extents: Vec<Aabb> = (0..slots)
            .map(|slot| child_extent(&node.extent, slot, self.params.dimension))
            .collect();

        let occupants = std::mem::take(&mut self.occupants[voxel]);
        let saturated = child_extents
            .iter()
            .filter(|extent| occupants.iter().all(|&i| facets[i].intersects_aabb(extent)))
            .count();
        if saturated >= 2 {
            self.blocked_at[voxel] = occupants.len();
            self.occupants[voxel] = occupants;
            return Ok(());
        }

        let parent = i32::try_from(voxel).map_err(|_| SpatialError::CapacityExceeded(voxel))?;
        for (slot, extent) in child_extents.into_iter().enumerate() {
            let id = self.push_voxel(Voxel::child(extent, parent, node.depth + 1))?;
            self.voxels[voxel].children[slot] = id;
        }
        for index in occupants {
            let node = self.voxels[voxel];
            for child in node.child_ids() {
                self.insert_into(child, index)?;
            }
        }
        Ok(())
    }

    /// Shrink `voxel` and its subtree to the region their facets occupy.
    fn contract(&mut self, voxel: usize) -> Aabb {
        let node = self.voxels[voxel];
        let contracted = if node.is_leaf() {
            self.occupants[voxel]
                .iter()
                .fold(Aabb::empty(), |acc, &i| {
                    acc.union(&self.extents[i].intersection(&node.extent))
                })
        } else {
            node.child_ids()
                .collect::<Vec<_>>()
                .into_iter()
                .fold(Aabb::empty(), |acc, child| acc.union(&self.contract(child)))
        };
        // Occupants admitted only by the overlap tolerance clip to nothing.
        let contracted = if contracted.is_empty() {
            node.extent
        } else {
            contracted
        };
        self.voxels[voxel].extent = contracted;
        contracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::{Segment, Triangle};

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::from_arrays(a, b, c)
    }

    fn grid_of_triangles(n: usize) -> Vec<Triangle> {
        let mut out = Vec::new();
        for i in 0..n {
            for j in 0..n {
                #[allow(clippy::cast_precision_loss)]
                let (x, y) = (i as f64, j as f64);
                out.push(tri([x, y, 0.0], [x + 1.0, y, 0.0], [x, y + 1.0, 0.0]));
                out.push(tri([x + 1.0, y, 0.0], [x + 1.0, y + 1.0, 0.0], [x, y + 1.0, 0.0]));
            }
        }
        out
    }

    fn brute_force(facets: &[Triangle], q: &Point3<f64>) -> f64 {
        facets
            .iter()
            .map(|f| f.distance_to(q))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn stores_multiple_facets() {
        let facets = vec![
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            tri([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]),
        ];
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        assert_eq!(tree.voxel_count(), 1);
        assert_eq!(tree.leaf_occupants(0).len(), 2);

        let hit = tree.closest_point(&Point3::new(0.1, 0.1, 0.9)).unwrap();
        assert_eq!(hit.index, Some(1));
        assert_relative_eq!(hit.distance, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn splits_when_over_full() {
        let facets = grid_of_triangles(8);
        let params = TreeParams::new().with_max_objects_per_voxel(4);
        let tree = DistanceTree::build(&facets, params).unwrap();
        let stats = tree.statistics();
        assert!(stats.voxel_count > 1);
        assert!(stats.deepest_level >= 1);
        assert!(stats.stored_references >= facets.len());
    }

    #[test]
    fn every_facet_is_stored() {
        let facets = grid_of_triangles(6);
        let params = TreeParams::new().with_max_objects_per_voxel(3);
        let tree = DistanceTree::build(&facets, params).unwrap();
        let mut seen = vec![false; facets.len()];
        for id in 0..tree.voxel_count() {
            for &i in tree.leaf_occupants(id) {
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn extents_contract_to_contents() {
        let facets = grid_of_triangles(4);
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        let root = tree.voxels()[0].extent;
        assert_relative_eq!(root.min.x, 0.0);
        assert_relative_eq!(root.max.x, 4.0);
        assert_relative_eq!(root.min.z, 0.0);
        assert_relative_eq!(root.max.z, 0.0);
    }

    #[test]
    fn children_lie_inside_parents() {
        let facets = grid_of_triangles(8);
        let params = TreeParams::new().with_max_objects_per_voxel(2);
        let tree = DistanceTree::build(&facets, params).unwrap();
        for voxel in tree.voxels() {
            for child in voxel.child_ids() {
                let c = tree.voxels()[child].extent;
                assert_eq!(voxel.extent.union(&c), voxel.extent);
            }
        }
    }

    #[test]
    fn query_matches_brute_force() {
        let facets = grid_of_triangles(10);
        let params = TreeParams::new().with_max_objects_per_voxel(5);
        let tree = DistanceTree::build(&facets, params).unwrap();
        for q in [
            Point3::new(3.3, 4.7, 2.0),
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(12.0, 5.5, -3.0),
            Point3::new(5.0, 5.0, 0.0),
        ] {
            let hit = tree.closest_point(&q).unwrap();
            assert_relative_eq!(hit.distance, brute_force(&facets, &q), epsilon = 1e-12);
        }
    }

    #[test]
    fn incumbent_that_is_closer_is_kept() {
        let facets = grid_of_triangles(3);
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        let q = Point3::new(1.5, 1.5, 5.0);
        let incumbent = Point3::new(1.5, 1.5, 4.0);
        let hit = tree.closest_point_and_index(&q, &incumbent);
        assert_eq!(hit.index, None);
        assert_eq!(hit.point, incumbent);
        assert_relative_eq!(hit.distance, 1.0);
    }

    #[test]
    fn incumbent_at_equal_distance_is_kept() {
        let facets = vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])];
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        let q = Point3::new(0.25, 0.25, 1.0);
        let incumbent = Point3::new(0.25, 0.25, 2.0);
        let hit = tree.closest_point_and_index(&q, &incumbent);
        assert_eq!(hit.index, None);
    }

    #[test]
    fn empty_tree_returns_incumbent() {
        let facets: Vec<Triangle> = Vec::new();
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        assert!(tree.is_empty());
        assert!(tree.closest_point(&Point3::origin()).is_none());
        let far = Point3::new(1e10, 1e10, 1e10);
        let hit = tree.closest_point_and_index(&Point3::origin(), &far);
        assert_eq!(hit.point, far);
        assert_eq!(hit.index, None);
    }

    #[test]
    fn single_point_facet() {
        let p = [2.0, 3.0, 4.0];
        let facets = vec![tri(p, p, p)];
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        let hit = tree.closest_point(&Point3::new(2.0, 3.0, 5.0)).unwrap();
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn coincident_facets_do_not_explode() {
        let facets = vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]); 100];
        let params = TreeParams::new().with_max_objects_per_voxel(4);
        let tree = DistanceTree::build(&facets, params).unwrap();
        assert!(tree.voxel_count() < 1000);
        let hit = tree.closest_point(&Point3::new(0.2, 0.2, 1.0)).unwrap();
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn insert_after_finalize_fails() {
        let facets = grid_of_triangles(2);
        let extent = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(3.0, 3.0, 1.0));
        let mut tree = DistanceTree::new(&facets, extent, TreeParams::default()).unwrap();
        tree.insert(0).unwrap();
        tree.finalize().unwrap();
        assert!(matches!(tree.insert(1), Err(SpatialError::Finalized)));
        assert!(matches!(tree.finalize(), Err(SpatialError::Finalized)));
    }

    #[test]
    fn insert_validates_index_and_extent() {
        let facets = vec![
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            tri([9.0, 9.0, 9.0], [10.0, 9.0, 9.0], [9.0, 10.0, 9.0]),
        ];
        let extent = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(2.0, 2.0, 2.0));
        let mut tree = DistanceTree::new(&facets, extent, TreeParams::default()).unwrap();
        assert!(matches!(
            tree.insert(5),
            Err(SpatialError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(matches!(tree.insert(1), Err(SpatialError::OutsideRoot { index: 1 })));
        assert!(tree.insert(0).is_ok());
    }

    #[test]
    fn invalid_params_rejected() {
        let facets: Vec<Triangle> = Vec::new();
        let bad = TreeParams::new().with_max_objects_per_voxel(0);
        assert!(matches!(
            DistanceTree::build(&facets, bad),
            Err(SpatialError::InvalidParameter(_))
        ));
        let extent = Aabb::empty();
        assert!(matches!(
            DistanceTree::new(&facets, extent, TreeParams::default()),
            Err(SpatialError::InvalidExtent)
        ));
    }

    #[test]
    fn depth_zero_keeps_single_leaf() {
        let facets = grid_of_triangles(5);
        let params = TreeParams::new().with_max_depth(0).with_max_objects_per_voxel(1);
        let tree = DistanceTree::build(&facets, params).unwrap();
        let stats = tree.statistics();
        assert_eq!(stats.voxel_count, 1);
        assert_eq!(stats.overfull_leaves, 1);
        assert_eq!(stats.max_leaf_occupancy, facets.len());
    }

    #[test]
    fn planar_quadtree_over_segments() {
        let mut segments = Vec::new();
        for i in 0..64 {
            let t = f64::from(i) * std::f64::consts::TAU / 64.0;
            let u = f64::from(i + 1) * std::f64::consts::TAU / 64.0;
            segments.push(Segment::planar([t.cos(), t.sin()], [u.cos(), u.sin()]));
        }
        let params = TreeParams::new()
            .with_dimension(Dimension::Planar)
            .with_max_objects_per_voxel(4);
        let tree = DistanceTree::build(&segments, params).unwrap();
        for voxel in tree.voxels() {
            assert!(voxel.children[4..].iter().all(|&c| c == NO_VOXEL));
        }
        let hit = tree.closest_point(&Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert!(hit.distance > 0.99 && hit.distance <= 1.0);
    }

    #[test]
    fn non_finite_facets_are_skipped() {
        let facets = vec![
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            tri([f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        assert_eq!(tree.statistics().stored_references, 1);
    }
}
