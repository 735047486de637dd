//! Flat records exchanged between ranks.
//!
//! Geometry crosses rank boundaries as raw bytes, so every record here is
//! `#[repr(C)]`, padding-free and [`Pod`].

use bytemuck::{Pod, Zeroable};
use mesh_types::{Point3, Segment, Triangle};

/// A triangle as three `[x, y, z]` points.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct FacetRecord {
    /// Vertex coordinates in order.
    pub points: [[f64; 3]; 3],
}

impl From<&Triangle> for FacetRecord {
    fn from(tri: &Triangle) -> Self {
        Self {
            points: tri.to_arrays(),
        }
    }
}

impl From<FacetRecord> for Triangle {
    fn from(record: FacetRecord) -> Self {
        let [a, b, c] = record.points;
        Self::from_arrays(a, b, c)
    }
}

/// A segment as two `[x, y, z]` points.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SegmentRecord {
    /// Endpoint coordinates in order.
    pub points: [[f64; 3]; 2],
}

impl From<&Segment> for SegmentRecord {
    fn from(seg: &Segment) -> Self {
        Self {
            points: [seg.a.coords.into(), seg.b.coords.into()],
        }
    }
}

impl From<SegmentRecord> for Segment {
    fn from(record: SegmentRecord) -> Self {
        let [a, b] = record.points;
        Self::new(Point3::from(a), Point3::from(b))
    }
}

/// Default per-facet metadata: who owns the facet and which boundary it
/// belongs to.
///
/// # Example
///
/// ```
/// use mesh_distance::FacetOwner;
///
/// let owner = FacetOwner::new(42, 3, 7);
/// assert_eq!(owner.global_id, 42);
/// assert_eq!(std::mem::size_of::<FacetOwner>(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct FacetOwner {
    /// Facet id, unique across all ranks.
    pub global_id: i64,
    /// Rank that owns the facet.
    pub rank: i32,
    /// Boundary tag of the facet.
    pub tag: i32,
}

impl FacetOwner {
    /// Create an owner record.
    #[must_use]
    pub const fn new(global_id: i64, rank: i32, tag: i32) -> Self {
        Self {
            global_id,
            rank,
            tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_comm::{decode, encode};

    #[test]
    fn triangle_survives_the_wire() {
        let tri = Triangle::from_arrays([0.0, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, -8.5]);
        let bytes = encode(&[FacetRecord::from(&tri)]);
        assert_eq!(bytes.len(), 72);
        let back: Vec<FacetRecord> = decode(&bytes).unwrap();
        assert_eq!(Triangle::from(back[0]), tri);
    }

    #[test]
    fn segment_keeps_z() {
        let seg = Segment::new(Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.5, 9.0));
        assert_eq!(Segment::from(SegmentRecord::from(&seg)), seg);
    }
}
