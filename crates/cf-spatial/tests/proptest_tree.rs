//! Property-based tests for the distance tree.
//!
//! The tree must agree with a linear scan for every query, whatever the
//! subdivision parameters.
//!
//! Run with: cargo test -p cf-spatial -- proptest

use cf_spatial::{Dimension, DistanceTree, TreeParams};
use mesh_types::{Facet, Point3, Segment, Triangle};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-50.0..50.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Small triangles scattered through the domain, so the tree has to split.
fn arb_triangle() -> impl Strategy<Value = Triangle> {
    (arb_point(), prop::array::uniform3(prop::array::uniform3(-3.0..3.0f64))).prop_map(
        |(base, offsets)| {
            let v = |o: [f64; 3]| Point3::new(base.x + o[0], base.y + o[1], base.z + o[2]);
            Triangle::new(v(offsets[0]), v(offsets[1]), v(offsets[2]))
        },
    )
}

fn arb_segment() -> impl Strategy<Value = Segment> {
    (prop::array::uniform2(-50.0..50.0f64), prop::array::uniform2(-4.0..4.0f64))
        .prop_map(|(a, d)| Segment::planar(a, [a[0] + d[0], a[1] + d[1]]))
}

fn arb_params() -> impl Strategy<Value = TreeParams> {
    (0u32..8, 1usize..12).prop_map(|(depth, objects)| {
        TreeParams::new()
            .with_max_depth(depth)
            .with_max_objects_per_voxel(objects)
    })
}

fn brute_force<F: Facet>(facets: &[F], query: &Point3<f64>) -> f64 {
    facets
        .iter()
        .map(|f| f.distance_to(query))
        .fold(f64::INFINITY, f64::min)
}

// =============================================================================
// Property Tests: Query Correctness
// =============================================================================

proptest! {
    /// Nearest distance equals the linear scan.
    #[test]
    fn triangles_match_brute_force(
        facets in prop::collection::vec(arb_triangle(), 1..120),
        queries in prop::collection::vec(arb_point(), 1..10),
        params in arb_params(),
    ) {
        let tree = DistanceTree::build(&facets, params).unwrap();
        for q in &queries {
            let hit = tree.closest_point(q).unwrap();
            let expected = brute_force(&facets, q);
            prop_assert!((hit.distance - expected).abs() <= 1e-9 * (1.0 + expected));
        }
    }

    /// The returned point lies on the returned facet.
    #[test]
    fn hit_point_belongs_to_hit_facet(
        facets in prop::collection::vec(arb_triangle(), 1..60),
        q in arb_point(),
    ) {
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        let hit = tree.closest_point(&q).unwrap();
        let index = hit.index.unwrap();
        let on_facet = facets[index].closest_point(&q);
        prop_assert!((on_facet - hit.point).norm() <= 1e-9 * (1.0 + hit.distance));
    }

    /// Planar quadtree over segments matches the linear scan.
    #[test]
    fn segments_match_brute_force(
        segments in prop::collection::vec(arb_segment(), 1..150),
        queries in prop::collection::vec(prop::array::uniform2(-60.0..60.0f64), 1..10),
        objects in 1usize..10,
    ) {
        let params = TreeParams::new()
            .with_dimension(Dimension::Planar)
            .with_max_objects_per_voxel(objects);
        let tree = DistanceTree::build(&segments, params).unwrap();
        for [x, y] in queries {
            let q = Point3::new(x, y, 0.0);
            let hit = tree.closest_point(&q).unwrap();
            let expected = brute_force(&segments, &q);
            prop_assert!((hit.distance - expected).abs() <= 1e-9 * (1.0 + expected));
        }
    }
}

// =============================================================================
// Property Tests: Incumbent Handling
// =============================================================================

proptest! {
    /// The result is never farther than the incumbent, and the incumbent is
    /// only replaced by something strictly closer.
    #[test]
    fn never_worse_than_incumbent(
        facets in prop::collection::vec(arb_triangle(), 1..60),
        q in arb_point(),
        incumbent in arb_point(),
    ) {
        let tree = DistanceTree::build(&facets, TreeParams::default()).unwrap();
        let hit = tree.closest_point_and_index(&q, &incumbent);
        let incumbent_distance = (incumbent - q).norm();
        prop_assert!(hit.distance <= incumbent_distance);
        if hit.index.is_none() {
            prop_assert_eq!(hit.point, incumbent);
        } else {
            prop_assert!(hit.distance < incumbent_distance);
        }
    }

    /// Every facet is registered in at least one leaf.
    #[test]
    fn every_facet_reachable(
        facets in prop::collection::vec(arb_triangle(), 1..100),
        params in arb_params(),
    ) {
        let tree = DistanceTree::build(&facets, params).unwrap();
        let mut seen = vec![false; facets.len()];
        for id in 0..tree.voxel_count() {
            for &i in tree.leaf_occupants(id) {
                seen[i] = true;
            }
        }
        prop_assert!(seen.iter().all(|&s| s));
    }
}
