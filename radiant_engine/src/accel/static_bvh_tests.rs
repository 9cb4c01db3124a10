/// Tests for StaticBvh
///
/// Validates the SAH build invariants (child containment, exact union
/// at internal nodes), query exactness, determinism, and the boundary
/// cases from empty input to a single primitive.

use super::*;
use glam::Vec3;
use slotmap::SlotMap;

fn make_keys(count: usize) -> Vec<EntityKey> {
    let mut arena = SlotMap::<EntityKey, ()>::with_key();
    (0..count).map(|_| arena.insert(())).collect()
}

fn make_aabb(min: (f32, f32, f32), max: (f32, f32, f32)) -> BoundingBox {
    BoundingBox::new(Vec3::from(min), Vec3::from(max))
}

/// Eight unit cubes centred on x = 0..7.
fn row_of_cubes() -> (Vec<EntityKey>, Vec<StaticLeaf>) {
    let keys = make_keys(8);
    let leaves = keys
        .iter()
        .enumerate()
        .map(|(i, &entity)| StaticLeaf {
            aabb: make_aabb(
                (i as f32 - 0.5, -0.5, -0.5),
                (i as f32 + 0.5, 0.5, 0.5),
            ),
            entity,
        })
        .collect();
    (keys, leaves)
}

#[test]
fn test_empty_input_builds_empty_tree() {
    let bvh = StaticBvh::build(&[]);
    assert!(bvh.is_empty());
    assert_eq!(bvh.node_count(), 0);

    let query = bvh.query_overlap(&make_aabb((-10.0, -10.0, -10.0), (10.0, 10.0, 10.0)));
    assert!(query.is_empty());
}

#[test]
fn test_single_primitive_is_root_leaf() {
    let keys = make_keys(1);
    let bvh = StaticBvh::build(&[StaticLeaf {
        aabb: make_aabb((0.0, 0.0, 0.0), (1.0, 1.0, 1.0)),
        entity: keys[0],
    }]);

    assert_eq!(bvh.node_count(), 1);
    let root = &bvh.nodes()[0];
    assert!(root.is_leaf());
    assert_eq!(root.entity, Some(keys[0]));
    assert_eq!(root.parent, NULL_NODE);
}

#[test]
fn test_internal_nodes_are_exact_unions() {
    let (_, leaves) = row_of_cubes();
    let bvh = StaticBvh::build(&leaves);

    for node in bvh.nodes() {
        if node.is_leaf() {
            continue;
        }
        let left = &bvh.nodes()[node.left as usize];
        let right = &bvh.nodes()[node.right as usize];
        let union = left.aabb.union(&right.aabb);
        assert!((node.aabb.min() - union.min()).length() < 1e-6);
        assert!((node.aabb.max() - union.max()).length() < 1e-6);
        assert!(node.aabb.contains(&left.aabb));
        assert!(node.aabb.contains(&right.aabb));
    }
}

#[test]
fn test_every_leaf_inside_root() {
    let (_, leaves) = row_of_cubes();
    let bvh = StaticBvh::build(&leaves);
    let root_aabb = bvh.nodes()[0].aabb;

    for node in bvh.nodes() {
        if node.is_leaf() {
            assert!(root_aabb.contains(&node.aabb));
        }
    }
}

#[test]
fn test_row_of_cubes_splits_on_x_at_midpoint() {
    let (keys, leaves) = row_of_cubes();
    let bvh = StaticBvh::build(&leaves);

    let root = &bvh.nodes()[0];
    assert!(!root.is_leaf());

    // The root split separates {0..3} from {4..7}: the left child's
    // AABB spans x in [-0.5, 3.5], the right child's x in [3.5, 7.5].
    let left = &bvh.nodes()[root.left as usize];
    let right = &bvh.nodes()[root.right as usize];
    assert!((left.aabb.min().x - (-0.5)).abs() < 1e-6);
    assert!((left.aabb.max().x - 3.5).abs() < 1e-6);
    assert!((right.aabb.min().x - 3.5).abs() < 1e-6);
    assert!((right.aabb.max().x - 7.5).abs() < 1e-6);

    let left_set = bvh.query_overlap(&make_aabb((-0.4, -0.4, -0.4), (3.4, 0.4, 0.4)));
    assert_eq!(left_set.len(), 4);
    for key in &keys[0..4] {
        assert!(left_set.contains(key));
    }
}

#[test]
fn test_query_exactness() {
    let (keys, leaves) = row_of_cubes();
    let bvh = StaticBvh::build(&leaves);

    // Query overlapping exactly cubes 2 and 3.
    let query = make_aabb((1.6, -0.2, -0.2), (3.4, 0.2, 0.2));
    let hits = bvh.query_overlap(&query);

    let expected: Vec<EntityKey> = vec![keys[2], keys[3]];
    assert_eq!(hits.len(), expected.len());
    for key in expected {
        assert!(hits.contains(&key));
    }

    // Brute-force cross-check against all leaves.
    for (i, leaf) in leaves.iter().enumerate() {
        assert_eq!(
            hits.contains(&keys[i]),
            leaf.aabb.intersects(&query),
            "mismatch for cube {}",
            i
        );
    }
}

#[test]
fn test_query_outside_returns_empty() {
    let (_, leaves) = row_of_cubes();
    let bvh = StaticBvh::build(&leaves);

    let hits = bvh.query_overlap(&make_aabb((100.0, 100.0, 100.0), (101.0, 101.0, 101.0)));
    assert!(hits.is_empty());
}

#[test]
fn test_build_is_deterministic() {
    let (_, leaves) = row_of_cubes();
    let a = StaticBvh::build(&leaves);
    let b = StaticBvh::build(&leaves);

    assert_eq!(a.node_count(), b.node_count());
    for (na, nb) in a.nodes().iter().zip(b.nodes()) {
        assert_eq!(na.left, nb.left);
        assert_eq!(na.right, nb.right);
        assert_eq!(na.entity, nb.entity);
    }
}

#[test]
fn test_identical_primitives_terminate() {
    // All centroids coincide; the degenerate fallback must still
    // produce one leaf per primitive.
    let keys = make_keys(5);
    let leaves: Vec<StaticLeaf> = keys
        .iter()
        .map(|&entity| StaticLeaf {
            aabb: make_aabb((0.0, 0.0, 0.0), (1.0, 1.0, 1.0)),
            entity,
        })
        .collect();

    let bvh = StaticBvh::build(&leaves);
    let leaf_count = bvh.nodes().iter().filter(|n| n.is_leaf()).count();
    assert_eq!(leaf_count, 5);

    let hits = bvh.query_overlap(&make_aabb((0.25, 0.25, 0.25), (0.75, 0.75, 0.75)));
    assert_eq!(hits.len(), 5);
}

#[test]
fn test_invalid_primitives_skipped() {
    let keys = make_keys(2);
    let leaves = vec![
        StaticLeaf {
            aabb: make_aabb((0.0, 0.0, 0.0), (1.0, 1.0, 1.0)),
            entity: keys[0],
        },
        StaticLeaf {
            aabb: BoundingBox::invalid(),
            entity: keys[1],
        },
    ];

    let bvh = StaticBvh::build(&leaves);
    assert_eq!(bvh.node_count(), 1);
    let hits = bvh.query_overlap(&make_aabb((0.1, 0.1, 0.1), (0.9, 0.9, 0.9)));
    assert!(hits.contains(&keys[0]));
    assert!(!hits.contains(&keys[1]));
}
