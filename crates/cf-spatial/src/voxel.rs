//! Voxel records of the distance tree arena.

use mesh_types::Aabb;
use nalgebra::Point3;

/// Child slot value meaning "no child here".
pub const NO_VOXEL: i32 = -1;

/// Maximum number of children a voxel can have (octree).
pub const MAX_CHILDREN: usize = 8;

/// Whether the tree subdivides all three axes or only `x` and `y`.
///
/// Planar problems keep every facet in the `z = 0` plane, so splitting `z`
/// only doubles the voxel count without separating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimension {
    /// Octree: 8 children per split.
    #[default]
    Volume,
    /// Quadtree in `x`/`y`: 4 children per split, `z` range inherited.
    Planar,
}

impl Dimension {
    /// Number of children produced by one split.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_spatial::Dimension;
    ///
    /// assert_eq!(Dimension::Volume.child_count(), 8);
    /// assert_eq!(Dimension::Planar.child_count(), 4);
    /// ```
    #[must_use]
    pub const fn child_count(self) -> usize {
        match self {
            Self::Volume => 8,
            Self::Planar => 4,
        }
    }
}

/// One node of the distance tree.
///
/// Voxels live in a flat arena and refer to each other by `i32` ids; the
/// root is id 0 and [`NO_VOXEL`] marks an absent child or the root's parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    /// Region covered by this voxel. Contracted to its contents on finalize.
    pub extent: Aabb,
    /// Child ids, [`NO_VOXEL`] where absent.
    pub children: [i32; MAX_CHILDREN],
    /// Parent id, [`NO_VOXEL`] for the root.
    pub parent: i32,
    /// Depth below the root.
    pub depth: u32,
}

impl Voxel {
    /// The root voxel covering `extent`.
    #[must_use]
    pub const fn root(extent: Aabb) -> Self {
        Self {
            extent,
            children: [NO_VOXEL; MAX_CHILDREN],
            parent: NO_VOXEL,
            depth: 0,
        }
    }

    /// A fresh leaf below `parent`.
    #[must_use]
    pub const fn child(extent: Aabb, parent: i32, depth: u32) -> Self {
        Self {
            extent,
            children: [NO_VOXEL; MAX_CHILDREN],
            parent,
            depth,
        }
    }

    /// True when the voxel has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c == NO_VOXEL)
    }

    /// Ids of the children that are present.
    pub fn child_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.children
            .iter()
            .filter_map(|&c| usize::try_from(c).ok())
    }
}

/// Extent of child `slot` of a voxel covering `parent`.
///
/// Slots follow the counter-clockwise order `0 = (lo, lo)`, `1 = (hi, lo)`,
/// `2 = (hi, hi)`, `3 = (lo, hi)` in `x`/`y`; slots `4..8` repeat it with the
/// upper half in `z`. In [`Dimension::Planar`] only slots `0..4` exist and
/// they span the full `z` range of the parent.
///
/// Siblings share their split planes exactly, so the children tile the
/// parent without gaps.
///
/// # Example
///
/// ```
/// use cf_spatial::{child_extent, Dimension};
/// use mesh_types::{Aabb, Point3};
///
/// let parent = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
/// let c = child_extent(&parent, 2, Dimension::Volume);
/// assert_eq!(c.min, Point3::new(1.0, 1.0, 0.0));
/// assert_eq!(c.max, Point3::new(2.0, 2.0, 1.0));
/// ```
#[must_use]
pub fn child_extent(parent: &Aabb, slot: usize, dimension: Dimension) -> Aabb {
    let mid = parent.center();
    let (lo, hi) = (parent.min, parent.max);

    let x_high = matches!(slot % 4, 1 | 2);
    let y_high = matches!(slot % 4, 2 | 3);
    let (x0, x1) = if x_high { (mid.x, hi.x) } else { (lo.x, mid.x) };
    let (y0, y1) = if y_high { (mid.y, hi.y) } else { (lo.y, mid.y) };
    let (z0, z1) = match dimension {
        Dimension::Planar => (lo.z, hi.z),
        Dimension::Volume if slot >= 4 => (mid.z, hi.z),
        Dimension::Volume => (lo.z, mid.z),
    };

    Aabb::new(Point3::new(x0, y0, z0), Point3::new(x1, y1, z1))
}
