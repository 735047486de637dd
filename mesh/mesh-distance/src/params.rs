//! Parameters for distributed distance search.

use cf_spatial::{Dimension, MAX_TREE_DEPTH, TreeParams};

use crate::error::{DistanceError, DistanceResult};

/// Parameters for distributed distance search.
///
/// Every rank must pass identical parameters; a mismatch is detected
/// collectively and reported as a consistency error on all ranks.
///
/// # Example
///
/// ```
/// use mesh_distance::SearchParams;
///
/// // Defaults: 5 rounds, depth 10, 20 facets per voxel
/// let params = SearchParams::default();
/// assert_eq!(params.shard_count, 5);
///
/// // Trade memory for fewer rounds
/// let fast = SearchParams::single_round();
/// assert_eq!(fast.shard_count, 1);
///
/// // Custom configuration
/// let custom = SearchParams::default().shard_count(12).max_objects_per_voxel(8);
/// assert!(custom.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchParams {
    /// Number of rounds the facet set is split into. Peak geometry held by
    /// a rank per round is roughly `1 / shard_count` of the total.
    pub shard_count: usize,

    /// Maximum depth of the per-round spatial index.
    pub max_depth: u32,

    /// A voxel splits once it holds more facets than this.
    pub max_objects_per_voxel: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            shard_count: 5,
            max_depth: 10,
            max_objects_per_voxel: 20,
        }
    }
}

impl SearchParams {
    /// Gather all geometry in one round. Fastest, highest peak memory.
    #[must_use]
    pub const fn single_round() -> Self {
        Self {
            shard_count: 1,
            max_depth: 10,
            max_objects_per_voxel: 20,
        }
    }

    /// Many small rounds for geometry that does not fit in memory at once.
    #[must_use]
    pub const fn low_memory() -> Self {
        Self {
            shard_count: 20,
            max_depth: 10,
            max_objects_per_voxel: 20,
        }
    }

    /// Set the number of rounds.
    #[must_use]
    pub const fn shard_count(mut self, count: usize) -> Self {
        self.shard_count = count;
        self
    }

    /// Set the maximum tree depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the voxel split threshold.
    #[must_use]
    pub const fn max_objects_per_voxel(mut self, count: usize) -> Self {
        self.max_objects_per_voxel = count;
        self
    }

    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::InvalidParams`] if any count is zero or
    /// `max_depth` exceeds [`MAX_TREE_DEPTH`].
    pub fn validate(&self) -> DistanceResult<()> {
        if self.shard_count == 0 {
            return Err(DistanceError::invalid_params("shard_count must be positive"));
        }
        if self.max_depth == 0 || self.max_depth > MAX_TREE_DEPTH {
            return Err(DistanceError::invalid_params(format!(
                "max_depth must be in 1..={MAX_TREE_DEPTH}, got {}",
                self.max_depth
            )));
        }
        if self.max_objects_per_voxel == 0 {
            return Err(DistanceError::invalid_params(
                "max_objects_per_voxel must be positive",
            ));
        }
        Ok(())
    }

    /// Tree parameters for one round.
    #[must_use]
    pub const fn tree_params(&self, dimension: Dimension) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            max_objects_per_voxel: self.max_objects_per_voxel,
            dimension,
        }
    }

    /// Fixed-width encoding used to compare parameters across ranks.
    pub(crate) fn fingerprint(&self) -> [u64; 3] {
        [
            self.shard_count as u64,
            u64::from(self.max_depth),
            self.max_objects_per_voxel as u64,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = SearchParams::default();
        assert_eq!(params.shard_count, 5);
        assert_eq!(params.max_depth, 10);
        assert_eq!(params.max_objects_per_voxel, 20);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(SearchParams::single_round().shard_count, 1);
        assert_eq!(SearchParams::low_memory().shard_count, 20);
        assert!(SearchParams::low_memory().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let params = SearchParams::default()
            .shard_count(7)
            .max_depth(4)
            .max_objects_per_voxel(3);
        assert_eq!(params.fingerprint(), [7, 4, 3]);
    }

    #[test]
    fn test_validation() {
        assert!(SearchParams::default().shard_count(0).validate().is_err());
        assert!(SearchParams::default().max_depth(0).validate().is_err());
        assert!(SearchParams::default().max_depth(MAX_TREE_DEPTH + 1).validate().is_err());
        assert!(SearchParams::default().max_objects_per_voxel(0).validate().is_err());
    }

    #[test]
    fn test_tree_params() {
        let tree = SearchParams::default().tree_params(Dimension::Planar);
        assert_eq!(tree.max_depth, 10);
        assert_eq!(tree.dimension, Dimension::Planar);
    }
}
