//! Distributed sharded nearest-surface search.
//!
//! Every rank owns some facets and some query points. The facets are
//! exchanged in `shard_count` rounds; in each round every rank gathers one
//! shard from everybody, culls what cannot matter for its own points, builds
//! a throwaway [`DistanceTree`] over the rest and folds the answers into a
//! running best. Peak geometry per rank is about `1 / shard_count` of the
//! global facet set.

use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use cf_comm::{Communicator, all_gather, all_gather_value};
use cf_spatial::{Dimension, DistanceTree};
use mesh_types::{Aabb, Facet, Point3, Triangle};
use tracing::{debug, info, warn};

use crate::cull::cull;
use crate::diagnostics::{DiagnosticsContext, RoundTiming};
use crate::error::{DistanceError, DistanceResult};
use crate::params::SearchParams;
use crate::result::SearchResult;
use crate::shard;
use crate::wire::{FacetOwner, FacetRecord};

/// Placeholder nearest point for query points no facet has reached yet.
///
/// Far enough to lose against any real facet, small enough that distances
/// to it stay finite.
#[must_use]
pub fn far_away_point() -> Point3<f64> {
    let far = f64::MAX.sqrt() * 0.25;
    Point3::new(far, far, far)
}

/// Best candidate found so far for each query point.
///
/// Entries only ever move strictly closer, so merging rounds in any order
/// gives the same final distances.
#[derive(Debug, Clone)]
pub struct RunningNearest<M> {
    points: Vec<Point3<f64>>,
    metadata: Vec<Option<M>>,
}

impl<M: Copy> RunningNearest<M> {
    /// All `count` points unresolved, at [`far_away_point`].
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            points: vec![far_away_point(); count],
            metadata: vec![None; count],
        }
    }

    /// Query every point against `tree`, warm-started from its current best,
    /// and keep strictly closer hits. `metadata[i]` belongs to facet `i` of
    /// the tree. Returns the number of points that improved.
    ///
    /// # Panics
    ///
    /// Panics if `metadata` is shorter than the tree's facet set and a hit
    /// lands past its end.
    pub fn merge<F: Facet>(
        &mut self,
        queries: &[Point3<f64>],
        tree: &DistanceTree<'_, F>,
        metadata: &[M],
        diagnostics: &mut DiagnosticsContext,
    ) -> usize {
        let mut improved = 0;
        let entries = self.points.iter_mut().zip(self.metadata.iter_mut());
        for (i, (query, (best, meta))) in queries.iter().zip(entries).enumerate() {
            let started = Instant::now();
            let hit = tree.closest_point_and_index(query, best);
            if let Some(index) = hit.index {
                *best = hit.point;
                *meta = Some(metadata[index]);
                improved += 1;
            }
            diagnostics.add_search_cost(i, started.elapsed().as_secs_f64());
        }
        improved
    }

    /// Current nearest point per query point.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Current metadata per query point.
    #[must_use]
    pub fn metadata(&self) -> &[Option<M>] {
        &self.metadata
    }

    /// Distance from each query point to its current nearest point.
    #[must_use]
    pub fn distances(&self, queries: &[Point3<f64>]) -> Vec<f64> {
        queries
            .iter()
            .zip(&self.points)
            .map(|(q, p)| (p - q).norm())
            .collect()
    }

    /// Split into nearest points and metadata.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Point3<f64>>, Vec<Option<M>>) {
        (self.points, self.metadata)
    }
}

/// What each rank reports before the first round.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct RankInputs {
    params: [u64; 3],
    facets: u64,
    metadata: u64,
}

/// Collectively check that every rank's inputs are consistent and that all
/// ranks use the same parameters. Returns the global facet count.
///
/// Every rank sees the same gathered table, so every rank reaches the same
/// verdict and no abort is needed.
pub(crate) fn agree_on_inputs<C: Communicator + ?Sized>(
    comm: &C,
    params: &SearchParams,
    facets: usize,
    metadata: usize,
) -> DistanceResult<u64> {
    let local = RankInputs {
        params: params.fingerprint(),
        facets: facets as u64,
        metadata: metadata as u64,
    };
    let all = all_gather_value(comm, local)?;

    if let Some((rank, bad)) = all.iter().enumerate().find(|(_, r)| r.facets != r.metadata) {
        return Err(DistanceError::consistency(format!(
            "rank {rank} has {} facets but {} metadata records",
            bad.facets, bad.metadata
        )));
    }
    if let Some(rank) = all.iter().position(|r| r.params != local.params) {
        return Err(DistanceError::consistency(format!(
            "search parameters of rank {rank} differ from rank {}",
            comm.rank()
        )));
    }
    params.validate()?;

    Ok(all.iter().map(|r| r.facets).sum())
}

/// Abort the world for a fatal error, unless the error is itself an abort.
pub(crate) fn fail<C: Communicator + ?Sized>(comm: &C, err: DistanceError) -> DistanceError {
    if !err.is_abort() {
        comm.abort();
    }
    err
}

/// Nearest point on the distributed facet set for every local query point.
///
/// Collective: every rank calls it with its own facets, metadata and query
/// points, and identical `params`. `metadata[i]` describes `facets[i]` and
/// is reported for every point whose nearest facet is `facets[i]`,
/// whichever rank owned it.
///
/// When no rank has any facet the call still succeeds: every point keeps
/// the [`far_away_point`] sentinel and `empty_input` is set.
///
/// # Errors
///
/// - [`DistanceError::Consistency`] if any rank's facet and metadata counts
///   differ or ranks disagree on `params` (raised on every rank)
/// - [`DistanceError::InvalidParams`] for invalid `params`
/// - [`DistanceError::Comm`] if communication fails or a peer aborted
///
/// # Example
///
/// ```
/// use cf_comm::LocalComm;
/// use mesh_distance::{DiagnosticsContext, FacetOwner, SearchParams, search};
/// use mesh_types::{Point3, Triangle};
///
/// let floor = [
///     Triangle::from_arrays([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
///     Triangle::from_arrays([0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
/// ];
/// let owners = [FacetOwner::new(0, 0, 1), FacetOwner::new(1, 0, 1)];
/// let points = [Point3::new(0.5, 0.5, 2.0)];
///
/// let result = search(
///     &LocalComm::solo(),
///     &floor,
///     &owners,
///     &points,
///     &SearchParams::default(),
///     &mut DiagnosticsContext::new(),
/// )
/// .unwrap();
///
/// assert!((result.distances[0] - 2.0).abs() < 1e-12);
/// assert_eq!(result.projected_points[0], Point3::new(0.5, 0.5, 0.0));
/// ```
pub fn search<C, M>(
    comm: &C,
    facets: &[Triangle],
    metadata: &[M],
    points: &[Point3<f64>],
    params: &SearchParams,
    diagnostics: &mut DiagnosticsContext,
) -> DistanceResult<SearchResult<M>>
where
    C: Communicator + ?Sized,
    M: Pod,
{
    let rank = comm.rank();
    info!(
        rank,
        facets = facets.len(),
        points = points.len(),
        shard_count = params.shard_count,
        "Starting wall distance search"
    );
    diagnostics.restart(points.len());
    diagnostics.sample_memory();

    let total_facets = agree_on_inputs(comm, params, facets.len(), metadata.len())?;
    let empty_input = total_facets == 0;

    let mut nearest = RunningNearest::new(points.len());
    if empty_input {
        if rank == 0 {
            warn!("No surface facets on any rank; all points keep the far-away sentinel");
        }
    } else {
        let rounds = Rounds {
            comm,
            facets,
            metadata,
            points,
            query_bounds: Aabb::from_points(points.iter()),
            params,
        };
        for round in 0..params.shard_count {
            if let Err(err) = rounds.run(round, &mut nearest, diagnostics) {
                return Err(fail(comm, err));
            }
        }
    }

    let summary = diagnostics.finish(comm)?;
    let distances = nearest.distances(points);
    let (projected_points, metadata) = nearest.into_parts();
    let result = SearchResult {
        distances,
        projected_points,
        metadata,
        search_cost: diagnostics.search_cost().to_vec(),
        empty_input,
        diagnostics: summary,
    };

    info!(
        rank,
        unresolved = result.unresolved_count(),
        elapsed_s = summary.elapsed_seconds,
        peak_memory_mb = summary.peak_memory_mb,
        load_balance = summary.load_balance,
        "Wall distance search complete"
    );
    Ok(result)
}

/// [`search`] with [`FacetOwner`] metadata generated from each facet's local
/// index and the owning rank (tag 0).
///
/// # Errors
///
/// As for [`search`].
pub fn search_without_metadata<C: Communicator + ?Sized>(
    comm: &C,
    facets: &[Triangle],
    points: &[Point3<f64>],
    params: &SearchParams,
    diagnostics: &mut DiagnosticsContext,
) -> DistanceResult<SearchResult<FacetOwner>> {
    let rank = rank_i32(comm)?;
    let owners = (0..facets.len())
        .map(|i| {
            let id = i64::try_from(i)
                .map_err(|_| DistanceError::invalid_params("local facet index overflows i64"))?;
            Ok(FacetOwner::new(id, rank, 0))
        })
        .collect::<DistanceResult<Vec<_>>>()?;
    search(comm, facets, &owners, points, params, diagnostics)
}

pub(crate) fn rank_i32<C: Communicator + ?Sized>(comm: &C) -> DistanceResult<i32> {
    i32::try_from(comm.rank())
        .map_err(|_| DistanceError::invalid_params(format!("rank {} does not fit in i32", comm.rank())))
}

/// Inputs shared by every round of one search call.
struct Rounds<'a, C: ?Sized, M> {
    comm: &'a C,
    facets: &'a [Triangle],
    metadata: &'a [M],
    points: &'a [Point3<f64>],
    query_bounds: Aabb,
    params: &'a SearchParams,
}

impl<C: Communicator + ?Sized, M: Pod> Rounds<'_, C, M> {
    fn run(
        &self,
        round: usize,
        nearest: &mut RunningNearest<M>,
        diagnostics: &mut DiagnosticsContext,
    ) -> DistanceResult<()> {
        let started = Instant::now();
        let rank = self.comm.rank();

        let (local_facets, local_metadata) =
            shard::extract(self.facets, self.metadata, round, self.params.shard_count)?;
        let records: Vec<FacetRecord> = local_facets.iter().map(FacetRecord::from).collect();
        drop(local_facets);

        let gathered = all_gather(self.comm, &records)?;
        let gathered_metadata = all_gather(self.comm, &local_metadata)?;
        drop(records);
        if gathered.len() != gathered_metadata.len() {
            return Err(DistanceError::consistency(format!(
                "round {round}: gathered {} facets but {} metadata records",
                gathered.len(),
                gathered_metadata.len()
            )));
        }
        diagnostics.sample_memory();

        let mut timing = RoundTiming {
            round,
            gathered: gathered.len(),
            survivors: 0,
            voxels: 0,
            seconds: 0.0,
        };

        if gathered.is_empty() || self.points.is_empty() {
            debug!(rank, round, gathered = gathered.len(), "Nothing to search this round");
        } else {
            let triangles: Vec<Triangle> = gathered.into_iter().map(Triangle::from).collect();
            let keep = cull(&triangles, &self.query_bounds);
            let survivors: Vec<Triangle> = keep.iter().map(|&i| triangles[i]).collect();
            let survivor_metadata: Vec<M> = keep.iter().map(|&i| gathered_metadata[i]).collect();
            drop(triangles);
            drop(gathered_metadata);

            let tree = DistanceTree::build(&survivors, self.params.tree_params(Dimension::Volume))?;
            diagnostics.sample_memory();
            let improved = nearest.merge(self.points, &tree, &survivor_metadata, diagnostics);

            timing.survivors = survivors.len();
            timing.voxels = tree.voxel_count();
            debug!(
                rank,
                round,
                gathered = timing.gathered,
                survivors = timing.survivors,
                voxels = timing.voxels,
                improved,
                "Finished search round"
            );
        }

        timing.seconds = started.elapsed().as_secs_f64();
        diagnostics.record_round(timing);
        Ok(())
    }
}
