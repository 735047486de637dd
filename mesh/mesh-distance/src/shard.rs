//! Round-robin partition of a rank's local facets into shards.
//!
//! Shard `s` of `n` holds local indices `i` with `i % n == s`. Each rank
//! partitions only its own facets, so shard sizes across ranks follow the
//! local facet counts; the gathered round is still one consistent global
//! snapshot.

use crate::error::{DistanceError, DistanceResult};

/// Local indices belonging to shard `shard` of `shard_count`.
///
/// Yields nothing when `shard_count` is zero.
pub fn shard_indices(len: usize, shard: usize, shard_count: usize) -> impl Iterator<Item = usize> {
    let step = shard_count.max(1);
    let start = if shard_count == 0 { len } else { shard };
    (start..len).step_by(step)
}

/// Planned size of every shard for `len` local facets.
///
/// # Example
///
/// ```
/// use mesh_distance::shard_sizes;
///
/// assert_eq!(shard_sizes(11, 4), vec![3, 3, 3, 2]);
/// assert_eq!(shard_sizes(2, 5), vec![1, 1, 0, 0, 0]);
/// ```
#[must_use]
pub fn shard_sizes(len: usize, shard_count: usize) -> Vec<usize> {
    if shard_count == 0 {
        return Vec::new();
    }
    let (base, extra) = (len / shard_count, len % shard_count);
    (0..shard_count).map(|s| base + usize::from(s < extra)).collect()
}

/// Copy the facets and metadata of one shard.
///
/// # Errors
///
/// - [`DistanceError::Consistency`] if `facets` and `metadata` differ in
///   length
/// - [`DistanceError::InvalidParams`] if `shard >= shard_count`
pub fn extract<F: Copy, M: Copy>(
    facets: &[F],
    metadata: &[M],
    shard: usize,
    shard_count: usize,
) -> DistanceResult<(Vec<F>, Vec<M>)> {
    if facets.len() != metadata.len() {
        return Err(DistanceError::consistency(format!(
            "{} facets but {} metadata records",
            facets.len(),
            metadata.len()
        )));
    }
    if shard >= shard_count {
        return Err(DistanceError::invalid_params(format!(
            "shard {shard} out of range for {shard_count} shards"
        )));
    }
    Ok(shard_indices(facets.len(), shard, shard_count)
        .map(|i| (facets[i], metadata[i]))
        .unzip())
}
