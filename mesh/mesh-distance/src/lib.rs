//! Distributed nearest-surface ("wall distance") search.
//!
//! Given a surface split into facets across the ranks of a distributed
//! computation, and query points on every rank, this crate finds for each
//! query point the closest point on the whole surface, its distance, and
//! metadata describing the facet it lies on.
//!
//! # Algorithm
//!
//! No rank ever holds the whole surface. The facet set is cut into
//! `shard_count` interleaved shards and processed in rounds:
//!
//! 1. Every rank contributes its local shard; the shards are gathered on
//!    every rank together with their metadata.
//! 2. Each rank culls gathered facets that cannot be closest to any of its
//!    own query points, using the bounding box of those points.
//! 3. The survivors are indexed with a [`cf_spatial::DistanceTree`] and
//!    every query point is searched, warm-started from its best hit so far.
//!
//! The final answer does not depend on the number of rounds or ranks, only
//! on the set of facets.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. Communication
//! goes through the [`cf_comm::Communicator`] trait, so it runs on:
//! - An MPI world, through a thin adapter
//! - Threads in one process ([`cf_comm::LocalWorld`])
//! - A single rank ([`cf_comm::LocalComm::solo`])
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use cf_comm::LocalWorld;
//! use mesh_distance::{SearchParams, distance_to_nodes};
//! use mesh_types::unit_cube;
//!
//! // Two ranks, each holding a copy of the cube; distance to its floor.
//! let results = LocalWorld::run(2, |comm| {
//!     let cube = unit_cube();
//!     distance_to_nodes(&comm, &cube, &BTreeSet::from([5]), &SearchParams::default())
//! })
//! .unwrap();
//!
//! for result in results {
//!     let result = result.unwrap();
//!     println!("{result}");
//!     assert_eq!(result.max_distance(), Some(1.0));
//! }
//! ```
//!
//! # Use Cases
//!
//! - **Turbulence Modelling**: Wall distance fields for RANS closures
//! - **Boundary Layers**: Distance to tagged no-slip walls on a partitioned mesh
//! - **Planar Problems**: Distance to polyline walls in 2D domains

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cull;
mod diagnostics;
mod error;
mod mesh_search;
mod params;
mod planar;
mod result;
mod search;
mod shard;
mod wire;

// Re-export main types and functions
pub use cull::{cull, cull_bound};
pub use diagnostics::{DiagnosticsContext, RoundTiming, SearchDiagnostics, resident_memory_mb};
pub use error::{DistanceError, DistanceResult};
pub use mesh_search::{
    OwnedFacets, distance_to_nodes, distance_to_tagged_surface, extract_owned_facets, union_tags,
};
pub use params::SearchParams;
pub use planar::search_segments;
pub use result::{PlanarResult, SearchResult};
pub use search::{RunningNearest, far_away_point, search, search_without_metadata};
pub use shard::{extract, shard_indices, shard_sizes};
pub use wire::{FacetOwner, FacetRecord, SegmentRecord};
