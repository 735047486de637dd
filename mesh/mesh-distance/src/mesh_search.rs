//! Wall distance on partitioned, tagged meshes.
//!
//! Each rank holds a piece of a larger mesh whose boundary faces carry
//! integer tags. These entry points pick the faces of the requested
//! boundaries, number them globally and run [`search`] with
//! [`FacetOwner`] metadata.

use std::collections::BTreeSet;

use cf_comm::{Communicator, all_gather, all_gather_value};
use mesh_types::{IndexedMesh, Point3, Triangle};
use tracing::warn;

use crate::diagnostics::DiagnosticsContext;
use crate::error::{DistanceError, DistanceResult};
use crate::params::SearchParams;
use crate::result::SearchResult;
use crate::search::{rank_i32, search};
use crate::wire::FacetOwner;

/// The local faces of the requested boundaries with their owners.
#[derive(Debug, Clone, Default)]
pub struct OwnedFacets {
    /// Face geometry.
    pub triangles: Vec<Triangle>,
    /// Owner record of each triangle, same order.
    pub owners: Vec<FacetOwner>,
}

impl OwnedFacets {
    /// Number of facets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True when this rank owns none of the requested faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Collect the local faces tagged with any of `tags`.
///
/// Global ids are assigned rank by rank: rank `r`'s facets are numbered
/// after every facet of ranks `0..r`, so ids are unique and contiguous
/// across the world.
///
/// Collective.
///
/// # Errors
///
/// Propagates communication errors.
pub fn extract_owned_facets<C: Communicator + ?Sized>(
    comm: &C,
    mesh: &IndexedMesh,
    tags: &BTreeSet<i32>,
) -> DistanceResult<OwnedFacets> {
    let rank = rank_i32(comm)?;
    let (triangles, face_tags): (Vec<Triangle>, Vec<i32>) =
        mesh.tagged_triangles(tags).map(|(_, tri, tag)| (tri, tag)).unzip();

    let counts = all_gather_value(comm, triangles.len() as u64)?;
    let offset: u64 = counts.iter().take(comm.rank()).sum();

    let owners = face_tags
        .iter()
        .enumerate()
        .map(|(k, &tag)| {
            let id = i64::try_from(offset + k as u64)
                .map_err(|_| DistanceError::invalid_params("global facet id overflows i64"))?;
            Ok(FacetOwner::new(id, rank, tag))
        })
        .collect::<DistanceResult<Vec<_>>>()?;

    Ok(OwnedFacets { triangles, owners })
}

/// Union of every rank's tag set.
///
/// Collective.
///
/// # Errors
///
/// Propagates communication errors.
pub fn union_tags<C: Communicator + ?Sized>(comm: &C, tags: &BTreeSet<i32>) -> DistanceResult<BTreeSet<i32>> {
    let local: Vec<i32> = tags.iter().copied().collect();
    Ok(all_gather(comm, &local)?.into_iter().collect())
}

/// Distance from each query point to the nearest face tagged with any of
/// `tags`, over the whole partitioned mesh.
///
/// Collective. The requested tag sets of all ranks are merged first, so
/// every rank searches the same boundary even when only some ranks name
/// it. Tags that exist on no rank are logged once and otherwise ignored.
///
/// # Errors
///
/// As for [`search`].
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
///
/// use cf_comm::LocalComm;
/// use mesh_distance::{SearchParams, distance_to_tagged_surface};
/// use mesh_types::{Point3, unit_cube};
///
/// let cube = unit_cube();
/// let floor = BTreeSet::from([5]);
/// let result = distance_to_tagged_surface(
///     &LocalComm::solo(),
///     &cube,
///     &floor,
///     &[Point3::new(0.5, 0.5, 0.75)],
///     &SearchParams::default(),
/// )
/// .unwrap();
///
/// assert!((result.distances[0] - 0.75).abs() < 1e-12);
/// assert_eq!(result.nearest_tags(), vec![Some(5)]);
/// ```
pub fn distance_to_tagged_surface<C: Communicator + ?Sized>(
    comm: &C,
    mesh: &IndexedMesh,
    tags: &BTreeSet<i32>,
    points: &[Point3<f64>],
    params: &SearchParams,
) -> DistanceResult<SearchResult<FacetOwner>> {
    let tags = union_tags(comm, tags)?;
    let present = union_tags(comm, &mesh.tags())?;
    let missing: Vec<i32> = tags.difference(&present).copied().collect();
    if !missing.is_empty() && comm.rank() == 0 {
        warn!(?missing, "Requested boundary tags not present on any rank");
    }

    let owned = extract_owned_facets(comm, mesh, &tags)?;
    let mut diagnostics = DiagnosticsContext::new();
    search(comm, &owned.triangles, &owned.owners, points, params, &mut diagnostics)
}

/// [`distance_to_tagged_surface`] evaluated at every local mesh vertex.
///
/// # Errors
///
/// As for [`search`].
pub fn distance_to_nodes<C: Communicator + ?Sized>(
    comm: &C,
    mesh: &IndexedMesh,
    tags: &BTreeSet<i32>,
    params: &SearchParams,
) -> DistanceResult<SearchResult<FacetOwner>> {
    distance_to_tagged_surface(comm, mesh, tags, &mesh.vertices, params)
}
