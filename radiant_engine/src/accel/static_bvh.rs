/// StaticBvh — SAH-built BVH for the immovable set.
///
/// Built once per static set and immutable thereafter. The build is
/// top-down: at each node the surface-area heuristic is evaluated on
/// all three axes over centroid-sorted primitives, with running
/// prefix/suffix areas so each axis costs O(n) after the sort.
///
/// Determinism: for a given input, ties are broken by preferring the
/// axis with the greatest extent, then the lower primitive index.
/// Every leaf holds exactly one entity, so overlap queries are exact;
/// the SAH early-out therefore picks the cheapest split rather than
/// collapsing clusters into multi-primitive leaves.

use rustc_hash::FxHashSet;
use crate::scene::EntityKey;
use super::bounding_box::BoundingBox;
use super::node::{BvhNode, NULL_NODE};

/// Fixed descent cost added to every split candidate.
const SAH_TRAVERSAL_COST: f32 = 0.125;

/// One input primitive for the static build.
#[derive(Debug, Clone, Copy)]
pub struct StaticLeaf {
    /// World-space AABB of the primitive
    pub aabb: BoundingBox,
    /// Entity owning the primitive
    pub entity: EntityKey,
}

/// Item carried through the recursive build: the original input index
/// is the final tie-break key.
#[derive(Clone, Copy)]
struct BuildItem {
    aabb: BoundingBox,
    centroid: glam::Vec3,
    entity: EntityKey,
    input_index: usize,
}

/// SAH-built static BVH. Root at index 0 after build.
pub struct StaticBvh {
    nodes: Vec<BvhNode>,
}

impl StaticBvh {
    /// Build from the immovable primitive set.
    ///
    /// Empty input yields an empty tree, not an error. Primitives with
    /// invalid AABBs are skipped.
    pub fn build(primitives: &[StaticLeaf]) -> Self {
        let mut items: Vec<BuildItem> = primitives
            .iter()
            .enumerate()
            .filter(|(_, p)| p.aabb.is_valid())
            .map(|(i, p)| BuildItem {
                aabb: p.aabb,
                centroid: p.aabb.center(),
                entity: p.entity,
                input_index: i,
            })
            .collect();

        if items.is_empty() {
            return Self { nodes: Vec::new() };
        }

        let mut nodes = Vec::with_capacity(items.len() * 2);
        Self::build_recursive(&mut nodes, &mut items, NULL_NODE);
        Self { nodes }
    }

    /// All entities whose leaf AABB overlaps the query box.
    ///
    /// Duplicates collapse to unique ids. Queries never allocate GPU
    /// resources and never fail; an empty tree returns an empty set.
    pub fn query_overlap(&self, aabb: &BoundingBox) -> FxHashSet<EntityKey> {
        let mut results = FxHashSet::default();
        if self.nodes.is_empty() || !aabb.is_valid() {
            return results;
        }

        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.aabb.intersects(aabb) {
                continue;
            }
            if node.is_leaf() {
                if let Some(entity) = node.entity {
                    results.insert(entity);
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
        results
    }

    /// Whether the tree holds no primitives.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total node count (internal + leaf).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Flat node array; root at index 0. Used by debug draw and tests.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    // ===== BUILD =====

    /// Recursive top-down build over `items`. Returns (node index,
    /// subtree height).
    fn build_recursive(
        nodes: &mut Vec<BvhNode>,
        items: &mut [BuildItem],
        parent: u32,
    ) -> (u32, i32) {
        let node_index = nodes.len() as u32;
        nodes.push(BvhNode::detached());

        let mut bounds = BoundingBox::invalid();
        for item in items.iter() {
            bounds = bounds.union(&item.aabb);
        }
        nodes[node_index as usize].aabb = bounds;
        nodes[node_index as usize].parent = parent;

        if items.len() == 1 {
            nodes[node_index as usize].entity = Some(items[0].entity);
            return (node_index, 0);
        }

        let (axis, split) = Self::choose_split(items, &bounds);

        // Partition: re-sort on the chosen axis, then recurse on the
        // two halves [0, split] and [split+1, n).
        Self::sort_by_axis(items, axis);
        let (left_items, right_items) = items.split_at_mut(split + 1);

        let (left, left_height) = Self::build_recursive(nodes, left_items, node_index);
        let (right, right_height) = Self::build_recursive(nodes, right_items, node_index);

        let height = 1 + left_height.max(right_height);
        let node = &mut nodes[node_index as usize];
        node.left = left;
        node.right = right;
        node.height = height;
        (node_index, height)
    }

    /// Evaluate the SAH on all three axes and return the winning
    /// (axis, last-left-item index).
    ///
    /// Axes are visited in descending-extent order with strict cost
    /// improvement, so equal-cost splits resolve to the widest axis;
    /// within an axis, candidates are visited in ascending index so
    /// the lower index wins ties.
    fn choose_split(items: &mut [BuildItem], bounds: &BoundingBox) -> (usize, usize) {
        let n = items.len();
        let parent_area = bounds.surface_area();
        let extent = bounds.extent();

        let mut axis_order = [0usize, 1, 2];
        axis_order.sort_by(|&a, &b| {
            extent[b].partial_cmp(&extent[a]).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut best_cost = f32::INFINITY;
        let mut best: Option<(usize, usize)> = None;

        let mut left_areas = vec![0.0f32; n];

        for &axis in &axis_order {
            Self::sort_by_axis(items, axis);

            let mut left_box = BoundingBox::invalid();
            for (i, item) in items.iter().enumerate() {
                left_box = left_box.union(&item.aabb);
                left_areas[i] = left_box.surface_area();
            }

            let mut right_box = BoundingBox::invalid();
            let mut costs = vec![0.0f32; n - 1];
            for i in (0..n - 1).rev() {
                right_box = right_box.union(&items[i + 1].aabb);
                let left_count = (i + 1) as f32;
                let right_count = (n - 1 - i) as f32;
                costs[i] = SAH_TRAVERSAL_COST
                    + (left_areas[i] * left_count + right_box.surface_area() * right_count)
                        / parent_area;
            }

            for (i, &cost) in costs.iter().enumerate() {
                if cost < best_cost {
                    best_cost = cost;
                    best = Some((axis, i));
                }
            }
        }

        // Degenerate input (zero parent area, all costs infinite):
        // median split on the widest axis keeps the recursion bounded.
        best.unwrap_or((axis_order[0], (n - 1) / 2))
    }

    /// Sort items by centroid on `axis`; the original input index
    /// breaks centroid ties so the order is total and deterministic.
    fn sort_by_axis(items: &mut [BuildItem], axis: usize) {
        items.sort_unstable_by(|a, b| {
            a.centroid[axis]
                .partial_cmp(&b.centroid[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.input_index.cmp(&b.input_index))
        });
    }
}

#[cfg(test)]
#[path = "static_bvh_tests.rs"]
mod tests;
