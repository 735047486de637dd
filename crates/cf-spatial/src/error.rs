//! Error types for spatial index operations.

/// Errors that can occur while building a distance tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SpatialError {
    /// A tree parameter is out of range.
    #[error("invalid tree parameter: {0}")]
    InvalidParameter(String),

    /// The root extent is empty or not finite.
    #[error("root extent must be finite and non-empty")]
    InvalidExtent,

    /// The tree was already finalized; it is read-only from then on.
    #[error("tree is finalized and can no longer be modified")]
    Finalized,

    /// A facet index does not refer to the backing facet slice.
    #[error("facet index {index} is out of range for {len} facets")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of facets backing the tree.
        len: usize,
    },

    /// A facet does not overlap the root voxel and cannot be stored.
    #[error("facet {index} lies outside the root extent")]
    OutsideRoot {
        /// The offending facet index.
        index: usize,
    },

    /// The voxel arena outgrew the `i32` id space.
    #[error("voxel arena exceeded {0} voxels")]
    CapacityExceeded(usize),
}
