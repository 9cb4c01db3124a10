/// Tests for DynamicBvh
///
/// Structural invariants are checked after every mutation with a full
/// tree walk: parent links, exact AABB unions at internal nodes,
/// height consistency, and the AVL balance bound.

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

fn unit_cube_at(x: f32, y: f32, z: f32) -> BoundingBox {
    make_aabb((x, y, z), (x + 1.0, y + 1.0, z + 1.0))
}

/// Walk the whole tree asserting every structural invariant.
fn validate(bvh: &DynamicBvh) {
    if bvh.root == NULL_NODE {
        assert_eq!(bvh.leaf_count(), 0);
        return;
    }

    assert_eq!(bvh.nodes[bvh.root as usize].parent, NULL_NODE);

    let mut visited_leaves = 0usize;
    let mut stack = vec![bvh.root];
    while let Some(index) = stack.pop() {
        let node = &bvh.nodes[index as usize];
        assert!(node.height >= 0, "free node reachable from root");

        if node.is_leaf() {
            assert_eq!(node.height, 0);
            let entity = node.entity.expect("leaf without entity");
            assert_eq!(
                bvh.entity_to_node.get(&entity),
                Some(&index),
                "entity map out of sync"
            );
            visited_leaves += 1;
            continue;
        }

        assert!(node.entity.is_none());
        let left = &bvh.nodes[node.left as usize];
        let right = &bvh.nodes[node.right as usize];

        assert_eq!(left.parent, index);
        assert_eq!(right.parent, index);

        // Exact union and containment
        let union = left.aabb.union(&right.aabb);
        assert!((node.aabb.min() - union.min()).length() < 1e-5);
        assert!((node.aabb.max() - union.max()).length() < 1e-5);

        // Height consistency and balance bound
        assert_eq!(node.height, 1 + left.height.max(right.height));
        assert!(
            (left.height - right.height).abs() <= 1,
            "unbalanced node {}: {} vs {}",
            index,
            left.height,
            right.height
        );

        stack.push(node.left);
        stack.push(node.right);
    }

    assert_eq!(visited_leaves, bvh.leaf_count());
}

#[test]
fn test_empty_tree() {
    let bvh = DynamicBvh::new();
    assert_eq!(bvh.height(), -1);
    assert_eq!(bvh.leaf_count(), 0);
    assert!(bvh
        .query_overlap(&make_aabb((-1.0, -1.0, -1.0), (1.0, 1.0, 1.0)))
        .is_empty());
}

#[test]
fn test_two_box_query() {
    let keys = make_keys(2);
    let mut bvh = DynamicBvh::new();

    bvh.insert(keys[0], make_aabb((0.0, 0.0, 0.0), (1.0, 1.0, 1.0)));
    bvh.insert(keys[1], make_aabb((2.0, 0.0, 0.0), (3.0, 1.0, 1.0)));
    validate(&bvh);

    // A thin segment spanning both boxes hits exactly {A, B}.
    let hits = bvh.query_overlap(&make_aabb((0.5, 0.5, 0.5), (2.5, 0.5, 0.5)));
    assert_eq!(hits.len(), 2);
    assert!(hits.contains(&keys[0]));
    assert!(hits.contains(&keys[1]));

    assert_eq!(bvh.height(), 1);
}

#[test]
fn test_insert_many_stays_balanced() {
    let keys = make_keys(64);
    let mut bvh = DynamicBvh::new();

    // Worst case for a naive tree: a strictly increasing line of boxes.
    for (i, &key) in keys.iter().enumerate() {
        bvh.insert(key, unit_cube_at(i as f32 * 2.0, 0.0, 0.0));
        validate(&bvh);
    }

    assert_eq!(bvh.leaf_count(), 64);
    // A balanced tree over 64 leaves cannot be deeper than ~2*log2(64).
    assert!(bvh.height() <= 12, "height {} too deep", bvh.height());
}

#[test]
fn test_remove_collapses_parent() {
    let keys = make_keys(3);
    let mut bvh = DynamicBvh::new();

    let a = bvh.insert(keys[0], unit_cube_at(0.0, 0.0, 0.0));
    let _b = bvh.insert(keys[1], unit_cube_at(5.0, 0.0, 0.0));
    let _c = bvh.insert(keys[2], unit_cube_at(10.0, 0.0, 0.0));
    validate(&bvh);

    bvh.remove(a);
    validate(&bvh);
    assert_eq!(bvh.leaf_count(), 2);
    assert_eq!(bvh.node_for_entity(keys[0]), None);

    let hits = bvh.query_overlap(&make_aabb((-1.0, -1.0, -1.0), (20.0, 2.0, 2.0)));
    assert_eq!(hits.len(), 2);
    assert!(!hits.contains(&keys[0]));
}

#[test]
fn test_remove_invalid_id_is_ignored() {
    let keys = make_keys(1);
    let mut bvh = DynamicBvh::new();
    let node = bvh.insert(keys[0], unit_cube_at(0.0, 0.0, 0.0));

    bvh.remove(9999);
    bvh.remove(node + 1);
    assert_eq!(bvh.leaf_count(), 1);
    validate(&bvh);

    // Removing twice through the map is also safe.
    bvh.remove_entity(keys[0]);
    bvh.remove_entity(keys[0]);
    assert_eq!(bvh.leaf_count(), 0);
}

#[test]
fn test_update_contained_is_noop() {
    let keys = make_keys(1);
    let mut bvh = DynamicBvh::new();
    let node = bvh.insert(keys[0], make_aabb((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)));

    // Shrinking inside the stored box reports no structural change.
    assert!(!bvh.update(node, make_aabb((1.0, 1.0, 1.0), (2.0, 2.0, 2.0))));

    // Escaping the stored box forces a reinsert.
    assert!(bvh.update(node, make_aabb((10.0, 0.0, 0.0), (11.0, 1.0, 1.0))));
    validate(&bvh);

    let hits = bvh.query_overlap(&make_aabb((9.5, 0.2, 0.2), (10.5, 0.8, 0.8)));
    assert!(hits.contains(&keys[0]));
}

#[test]
fn test_update_moves_query_results() {
    let keys = make_keys(8);
    let mut bvh = DynamicBvh::new();
    let nodes: Vec<u32> = keys
        .iter()
        .enumerate()
        .map(|(i, &key)| bvh.insert(key, unit_cube_at(i as f32 * 3.0, 0.0, 0.0)))
        .collect();

    // Teleport entity 0 next to entity 7.
    bvh.update(nodes[0], unit_cube_at(21.0, 3.0, 0.0));
    validate(&bvh);

    let near_origin = bvh.query_overlap(&make_aabb((-0.5, -0.5, -0.5), (0.5, 0.5, 0.5)));
    assert!(!near_origin.contains(&keys[0]));

    let near_end = bvh.query_overlap(&make_aabb((20.0, 2.0, -0.5), (23.0, 5.0, 1.5)));
    assert!(near_end.contains(&keys[0]));
}

#[test]
fn test_mixed_sequence_keeps_invariants() {
    let keys = make_keys(32);
    let mut bvh = DynamicBvh::new();

    for (i, &key) in keys.iter().enumerate() {
        bvh.insert(key, unit_cube_at((i % 8) as f32 * 2.0, (i / 8) as f32 * 2.0, 0.0));
    }
    validate(&bvh);

    // Remove every third entity, update every fourth, reinsert a few.
    for (i, &key) in keys.iter().enumerate() {
        if i % 3 == 0 {
            bvh.remove_entity(key);
        } else if i % 4 == 0 {
            let node = bvh.node_for_entity(key).unwrap();
            bvh.update(node, unit_cube_at(i as f32, -5.0, 3.0));
        }
        validate(&bvh);
    }

    // Query equals the brute-force answer over surviving leaves.
    let query = make_aabb((-1.0, -6.0, -1.0), (40.0, 1.0, 4.0));
    let hits = bvh.query_overlap(&query);
    for &key in &keys {
        match bvh.node_for_entity(key) {
            Some(node) => {
                let expected = bvh.nodes[node as usize].aabb.intersects(&query);
                assert_eq!(hits.contains(&key), expected);
            }
            None => assert!(!hits.contains(&key)),
        }
    }
}

#[test]
fn test_clear() {
    let keys = make_keys(10);
    let mut bvh = DynamicBvh::new();
    for (i, &key) in keys.iter().enumerate() {
        bvh.insert(key, unit_cube_at(i as f32 * 2.0, 0.0, 0.0));
    }

    bvh.clear();
    assert_eq!(bvh.leaf_count(), 0);
    assert_eq!(bvh.height(), -1);
    validate(&bvh);

    // The arena is reusable after clear.
    bvh.insert(keys[0], unit_cube_at(0.0, 0.0, 0.0));
    validate(&bvh);
    assert_eq!(bvh.leaf_count(), 1);
}

#[test]
fn test_arena_growth() {
    // More inserts than the initial capacity forces arena growth
    // mid-insertion (internal nodes double the node demand).
    let keys = make_keys(100);
    let mut bvh = DynamicBvh::new();
    for (i, &key) in keys.iter().enumerate() {
        bvh.insert(key, unit_cube_at((i % 10) as f32, (i / 10) as f32, 0.0));
    }
    validate(&bvh);
    assert_eq!(bvh.leaf_count(), 100);
}
