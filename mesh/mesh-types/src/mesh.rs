//! Indexed triangle mesh with per-face boundary tags.

use std::collections::BTreeSet;

use crate::{Aabb, Triangle};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh whose faces carry integer boundary tags.
///
/// This is the slice of a surface mesh owned by one worker: wall distance
/// selects faces by tag (for example "all no-slip walls") and queries
/// against the resulting triangles.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3};
///
/// let mut mesh = IndexedMesh::new();
/// mesh.vertices.push(Point3::new(0.0, 0.0, 0.0));
/// mesh.vertices.push(Point3::new(1.0, 0.0, 0.0));
/// mesh.vertices.push(Point3::new(0.0, 1.0, 0.0));
/// mesh.push_face([0, 1, 2], 7);
///
/// assert_eq!(mesh.face_count(), 1);
/// assert_eq!(mesh.tags().into_iter().collect::<Vec<_>>(), vec![7]);
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexedMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,

    /// Triangle faces as indices into the vertex array.
    pub faces: Vec<[u32; 3]>,

    /// Boundary tag of each face; `face_tags.len() == faces.len()`.
    pub face_tags: Vec<i32>,
}

impl IndexedMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            face_tags: Vec::new(),
        }
    }

    /// Create a mesh from raw coordinate, index and tag data.
    ///
    /// Returns `None` if `positions` or `indices` are not multiples of three,
    /// or if there is not exactly one tag per face.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::IndexedMesh;
    ///
    /// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = IndexedMesh::from_raw(&positions, &[0, 1, 2], &[3]).unwrap();
    /// assert_eq!(mesh.vertex_count(), 3);
    /// assert!(IndexedMesh::from_raw(&positions, &[0, 1, 2], &[]).is_none());
    /// ```
    #[must_use]
    pub fn from_raw(positions: &[f64], indices: &[u32], tags: &[i32]) -> Option<Self> {
        if positions.len() % 3 != 0 || indices.len() % 3 != 0 || indices.len() / 3 != tags.len() {
            return None;
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

        Some(Self {
            vertices,
            faces,
            face_tags: tags.to_vec(),
        })
    }

    /// Append a face with its tag.
    pub fn push_face(&mut self, face: [u32; 3], tag: i32) {
        self.faces.push(face);
        self.face_tags.push(tag);
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when the mesh has no faces.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Resolve a face to a triangle.
    ///
    /// Returns `None` if the face index or any of its vertex indices is out
    /// of range.
    #[must_use]
    pub fn triangle(&self, face_index: usize) -> Option<Triangle> {
        let [a, b, c] = *self.faces.get(face_index)?;
        let v = |i: u32| self.vertices.get(i as usize).copied();
        Some(Triangle::new(v(a)?, v(b)?, v(c)?))
    }

    /// Faces whose tag is in `tags`, as `(face_index, triangle, tag)`.
    ///
    /// Faces with dangling vertex indices are skipped.
    pub fn tagged_triangles<'a>(
        &'a self,
        tags: &'a BTreeSet<i32>,
    ) -> impl Iterator<Item = (usize, Triangle, i32)> + 'a {
        self.face_tags
            .iter()
            .enumerate()
            .filter(|&(_, tag)| tags.contains(tag))
            .filter_map(|(i, &tag)| self.triangle(i).map(|tri| (i, tri, tag)))
    }

    /// The distinct face tags present in the mesh.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<i32> {
        self.face_tags.iter().copied().collect()
    }

    /// Bounding box of all vertices; empty for a mesh without vertices.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }
}

/// Axis-aligned unit cube `[0, 1]^3` whose six sides carry tags `1..=6`.
///
/// Sides are tagged `-x, +x, -y, +y, -z, +z` in that order.
#[must_use]
pub fn unit_cube() -> IndexedMesh {
    let positions = [
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, //
        1.0, 0.0, 1.0, //
        1.0, 1.0, 1.0, //
        0.0, 1.0, 1.0,
    ];
    let sides: [([u32; 3], [u32; 3], i32); 6] = [
        ([0, 3, 7], [0, 7, 4], 1),
        ([1, 5, 6], [1, 6, 2], 2),
        ([0, 4, 5], [0, 5, 1], 3),
        ([2, 6, 7], [2, 7, 3], 4),
        ([0, 2, 1], [0, 3, 2], 5),
        ([4, 5, 6], [4, 6, 7], 6),
    ];
    let mut mesh = IndexedMesh {
        vertices: positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect(),
        ..IndexedMesh::default()
    };
    for (a, b, tag) in sides {
        mesh.push_face(a, tag);
        mesh.push_face(b, tag);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Facet;

    #[test]
    fn unit_cube_has_six_tagged_sides() {
        let cube = unit_cube();
        assert_eq!(cube.face_count(), 12);
        assert_eq!(cube.tags().len(), 6);
        let bounds = cube.bounds();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn tagged_triangles_selects_by_tag() {
        let cube = unit_cube();
        let bottom: BTreeSet<i32> = [5].into_iter().collect();
        let faces: Vec<_> = cube.tagged_triangles(&bottom).collect();
        assert_eq!(faces.len(), 2);
        for (_, tri, tag) in &faces {
            assert_eq!(*tag, 5);
            assert!(tri.extent().max.z.abs() < 1e-12);
        }
    }

    #[test]
    fn dangling_face_is_skipped() {
        let mut mesh = IndexedMesh::new();
        mesh.vertices.push(Point3::origin());
        mesh.push_face([0, 1, 2], 1);
        assert!(mesh.triangle(0).is_none());
        let tags: BTreeSet<i32> = [1].into_iter().collect();
        assert_eq!(mesh.tagged_triangles(&tags).count(), 0);
    }

    #[test]
    fn from_raw_rejects_bad_lengths() {
        assert!(IndexedMesh::from_raw(&[0.0, 1.0], &[], &[]).is_none());
        assert!(IndexedMesh::from_raw(&[], &[0, 1], &[]).is_none());
        assert!(IndexedMesh::from_raw(&[], &[], &[]).is_some());
    }
}
