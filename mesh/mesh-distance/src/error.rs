//! Error types for distance search.

use cf_comm::CommError;
use cf_spatial::SpatialError;
use thiserror::Error;

/// Result type alias for distance search operations.
pub type DistanceResult<T> = Result<T, DistanceError>;

/// Errors that can occur during a distributed distance search.
///
/// Every variant is raised identically on all ranks, or is followed by a
/// collective abort, so no rank is left waiting in a collective.
#[derive(Debug, Error)]
pub enum DistanceError {
    /// Facet and metadata counts disagree, or ranks disagree on the search
    /// configuration. The computation cannot be trusted.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Invalid search parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Communication failed.
    #[error("communication failed: {0}")]
    Comm(#[from] CommError),

    /// The spatial index rejected its input.
    #[error("spatial index error: {0}")]
    Spatial(#[from] SpatialError),
}

impl DistanceError {
    /// Create a consistency error.
    #[must_use]
    pub fn consistency(details: impl Into<String>) -> Self {
        Self::Consistency(details.into())
    }

    /// Create an invalid params error.
    #[must_use]
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }

    /// Whether this error was caused by a peer aborting the computation.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Comm(CommError::Aborted))
    }
}
