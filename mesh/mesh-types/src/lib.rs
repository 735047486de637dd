//! Facet geometry for nearest-surface queries.
//!
//! This crate provides the geometric vocabulary used by the wall distance
//! crates:
//!
//! - [`Aabb`] - Axis-aligned bounding extent, including the
//!   closest/furthest possible distance bounds used for culling
//! - [`Triangle`] - Triangle facet with robust closest-point projection
//! - [`Segment`] - Line segment facet for planar (2D) walls
//! - [`Facet`] - Trait implemented by every queryable facet kind
//! - [`IndexedMesh`] - Triangle mesh with per-face boundary tags
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies** and no I/O.
//!
//! # Units
//!
//! This library is **unit-agnostic**. All coordinates are `f64`.
//!
//! # Example
//!
//! ```
//! use mesh_types::{Aabb, Facet, Point3, Triangle};
//!
//! // A unit square at z = 0 split into two triangles
//! let lower = Triangle::from_arrays([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
//! let upper = Triangle::from_arrays([0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
//!
//! let query = Point3::new(0.5, 0.5, 2.0);
//! let d = lower.distance_to(&query).min(upper.distance_to(&query));
//! assert!((d - 2.0).abs() < 1e-12);
//!
//! let bounds = lower.extent().union(&upper.extent());
//! assert!(bounds.closest_possible_distance(&Aabb::from_point(query)) <= d);
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod bounds;
mod mesh;
mod segment;
mod traits;
mod triangle;

// Re-export core types
pub use bounds::Aabb;
pub use mesh::{IndexedMesh, unit_cube};
pub use segment::Segment;
pub use traits::Facet;
pub use triangle::Triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
