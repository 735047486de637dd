//! Nearest-wall search for planar problems.
//!
//! In two dimensions the wall is a set of segments in the `z = 0` plane.
//! Segment sets are small next to surface meshes, so they are gathered in
//! one round without culling and indexed with a quadtree.

use cf_comm::{Communicator, all_gather};
use cf_spatial::{Dimension, DistanceTree};
use mesh_types::{Point3, Segment};
use tracing::{debug, info, warn};

use crate::error::DistanceResult;
use crate::params::SearchParams;
use crate::result::PlanarResult;
use crate::search::{agree_on_inputs, fail, far_away_point};
use crate::wire::SegmentRecord;

/// Nearest point on the distributed segment set for every local query
/// point.
///
/// Collective. `params.shard_count` is ignored; the depth and occupancy
/// limits configure the quadtree.
///
/// # Errors
///
/// - [`DistanceError::Consistency`](crate::DistanceError::Consistency) if
///   ranks disagree on `params`
/// - [`DistanceError::InvalidParams`](crate::DistanceError::InvalidParams)
///   for invalid `params`
/// - [`DistanceError::Comm`](crate::DistanceError::Comm) if communication
///   fails
///
/// # Example
///
/// ```
/// use cf_comm::LocalComm;
/// use mesh_distance::{SearchParams, search_segments};
/// use mesh_types::{Point3, Segment};
///
/// let wall = [Segment::planar([0.0, 0.0], [4.0, 0.0])];
/// let result = search_segments(
///     &LocalComm::solo(),
///     &wall,
///     &[Point3::new(1.0, 3.0, 0.0)],
///     &SearchParams::default(),
/// )
/// .unwrap();
///
/// assert!((result.distances[0] - 3.0).abs() < 1e-12);
/// ```
pub fn search_segments<C: Communicator + ?Sized>(
    comm: &C,
    segments: &[Segment],
    points: &[Point3<f64>],
    params: &SearchParams,
) -> DistanceResult<PlanarResult> {
    let rank = comm.rank();
    info!(rank, segments = segments.len(), points = points.len(), "Starting planar wall distance search");

    let total = agree_on_inputs(comm, params, segments.len(), segments.len())?;
    let far = far_away_point();

    if total == 0 {
        if rank == 0 {
            warn!("No wall segments on any rank; all points keep the far-away sentinel");
        }
        return Ok(PlanarResult {
            distances: points.iter().map(|p| (far - p).norm()).collect(),
            projected_points: vec![far; points.len()],
            empty_input: true,
        });
    }

    let records: Vec<SegmentRecord> = segments.iter().map(SegmentRecord::from).collect();
    let gathered: Vec<Segment> = match all_gather(comm, &records) {
        Ok(gathered) => gathered.into_iter().map(Segment::from).collect(),
        Err(err) => return Err(fail(comm, err.into())),
    };

    let tree = match DistanceTree::build(&gathered, params.tree_params(Dimension::Planar)) {
        Ok(tree) => tree,
        Err(err) => return Err(fail(comm, err.into())),
    };
    debug!(rank, segments = gathered.len(), voxels = tree.voxel_count(), "Built planar index");

    let projected_points: Vec<Point3<f64>> = points
        .iter()
        .map(|p| tree.closest_point_and_index(p, &far).point)
        .collect();
    let distances = points
        .iter()
        .zip(&projected_points)
        .map(|(q, p)| (p - q).norm())
        .collect();

    info!(rank, "Planar wall distance search complete");
    Ok(PlanarResult {
        distances,
        projected_points,
        empty_input: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cf_comm::{LocalComm, LocalWorld};

    fn square_wall() -> Vec<Segment> {
        vec![
            Segment::planar([0.0, 0.0], [1.0, 0.0]),
            Segment::planar([1.0, 0.0], [1.0, 1.0]),
            Segment::planar([1.0, 1.0], [0.0, 1.0]),
            Segment::planar([0.0, 1.0], [0.0, 0.0]),
        ]
    }

    #[test]
    fn inside_square() {
        let result = search_segments(
            &LocalComm::solo(),
            &square_wall(),
            &[Point3::new(0.5, 0.25, 0.0), Point3::new(0.9, 0.5, 0.0)],
            &SearchParams::default(),
        )
        .unwrap();
        assert_relative_eq!(result.distances[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(result.distances[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(result.projected_points[1], Point3::new(1.0, 0.5, 0.0), epsilon = 1e-12);
        assert!(!result.empty_input);
    }

    #[test]
    fn segments_split_across_ranks() {
        let results = LocalWorld::run(2, |comm| {
            let wall = square_wall();
            let mine: Vec<Segment> = wall.into_iter().skip(comm.rank() * 2).take(2).collect();
            let point = if comm.rank() == 0 {
                Point3::new(0.1, 0.5, 0.0)
            } else {
                Point3::new(0.5, 0.95, 0.0)
            };
            search_segments(&comm, &mine, &[point], &SearchParams::default())
        })
        .unwrap();
        assert_relative_eq!(results[0].as_ref().unwrap().distances[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(results[1].as_ref().unwrap().distances[0], 0.05, epsilon = 1e-12);
    }

    #[test]
    fn no_segments_anywhere() {
        let result = search_segments(
            &LocalComm::solo(),
            &[],
            &[Point3::origin()],
            &SearchParams::default(),
        )
        .unwrap();
        assert!(result.empty_input);
        assert_eq!(result.projected_points[0], far_away_point());
        assert!(result.distances[0].is_finite());
    }
}
