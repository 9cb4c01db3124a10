/// DynamicBvh — self-balancing BVH for movable geometry.
///
/// Nodes live in a flat arena with an intrusive free list (the `right`
/// field doubles as the free-list link). Insertion descends from the
/// root picking the child that minimises the incremental surface-area
/// cost; ancestors are refitted and rebalanced with single/double
/// rotations so that `|height(left) - height(right)| <= 1` holds at
/// every internal node after each public operation.
///
/// An entity -> node map backs O(1) removal and validates caller-held
/// node ids before they are trusted.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::scene::EntityKey;
use super::bounding_box::BoundingBox;
use super::node::{BvhNode, NULL_NODE};

/// Initial arena capacity; doubles on exhaustion.
const INITIAL_CAPACITY: usize = 16;

/// Incrementally maintained BVH over movable entities.
pub struct DynamicBvh {
    nodes: Vec<BvhNode>,
    root: u32,
    free_list: u32,
    node_count: u32,
    entity_to_node: FxHashMap<EntityKey, u32>,
}

impl DynamicBvh {
    /// Create an empty tree.
    pub fn new() -> Self {
        let mut bvh = Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
            node_count: 0,
            entity_to_node: FxHashMap::default(),
        };
        bvh.grow_arena(INITIAL_CAPACITY);
        bvh
    }

    /// Insert a leaf for `entity` and return its node id.
    ///
    /// The id stays valid until `remove`/`clear`; it is also reachable
    /// through the entity -> node map.
    pub fn insert(&mut self, entity: EntityKey, aabb: BoundingBox) -> u32 {
        debug_assert!(
            !self.entity_to_node.contains_key(&entity),
            "entity already inserted"
        );

        let leaf = self.allocate_node();
        {
            let node = &mut self.nodes[leaf as usize];
            node.aabb = aabb;
            node.entity = Some(entity);
        }
        self.insert_leaf(leaf);
        self.entity_to_node.insert(entity, leaf);
        leaf
    }

    /// Remove a leaf by node id.
    ///
    /// Ids are validated against the entity -> node map; a stale or
    /// foreign id is ignored with a warning instead of corrupting the
    /// tree.
    pub fn remove(&mut self, node_id: u32) {
        if !self.is_live_leaf(node_id) {
            crate::engine_warn!("radiant::DynamicBvh", "remove: invalid node id {}", node_id);
            return;
        }
        let entity = self.nodes[node_id as usize].entity;
        self.remove_leaf(node_id);
        self.free_node(node_id);
        if let Some(entity) = entity {
            self.entity_to_node.remove(&entity);
        }
    }

    /// Remove the leaf owned by `entity`, if any.
    pub fn remove_entity(&mut self, entity: EntityKey) {
        if let Some(&node_id) = self.entity_to_node.get(&entity) {
            self.remove(node_id);
        }
    }

    /// Move a leaf to a new AABB.
    ///
    /// Returns `false` (no structural change) while the stored AABB
    /// still contains the new one; otherwise the leaf is re-inserted
    /// and `true` is returned.
    pub fn update(&mut self, node_id: u32, aabb: BoundingBox) -> bool {
        if !self.is_live_leaf(node_id) {
            crate::engine_warn!("radiant::DynamicBvh", "update: invalid node id {}", node_id);
            return false;
        }

        if self.nodes[node_id as usize].aabb.contains(&aabb) {
            return false;
        }

        self.remove_leaf(node_id);
        self.nodes[node_id as usize].aabb = aabb;
        self.insert_leaf(node_id);
        true
    }

    /// All entities whose leaf AABB overlaps the query box.
    pub fn query_overlap(&self, aabb: &BoundingBox) -> FxHashSet<EntityKey> {
        let mut results = FxHashSet::default();
        if self.root == NULL_NODE || !aabb.is_valid() {
            return results;
        }

        let mut stack = vec![self.root];
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

    /// Node id for an entity, if it is currently inserted.
    pub fn node_for_entity(&self, entity: EntityKey) -> Option<u32> {
        self.entity_to_node.get(&entity).copied()
    }

    /// Number of live leaves.
    pub fn leaf_count(&self) -> usize {
        self.entity_to_node.len()
    }

    /// Height of the tree; -1 when empty, 0 for a single leaf.
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            -1
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Remove every leaf and reset the arena.
    pub fn clear(&mut self) {
        self.root = NULL_NODE;
        self.node_count = 0;
        self.entity_to_node.clear();
        let capacity = self.nodes.len();
        self.nodes.clear();
        self.free_list = NULL_NODE;
        self.grow_arena(capacity);
    }

    // ===== ARENA =====

    /// Append `additional` free nodes chained through `right`.
    fn grow_arena(&mut self, additional: usize) {
        let start = self.nodes.len();
        self.nodes
            .extend(std::iter::repeat(BvhNode::detached()).take(additional));
        for i in start..self.nodes.len() {
            let next = if i + 1 < self.nodes.len() {
                (i + 1) as u32
            } else {
                self.free_list
            };
            let node = &mut self.nodes[i];
            node.right = next;
            node.height = -1;
        }
        self.free_list = start as u32;
    }

    fn allocate_node(&mut self) -> u32 {
        if self.free_list == NULL_NODE {
            let capacity = self.nodes.len();
            self.grow_arena(capacity.max(INITIAL_CAPACITY));
        }

        let index = self.free_list;
        self.free_list = self.nodes[index as usize].right;

        let node = &mut self.nodes[index as usize];
        node.aabb = BoundingBox::invalid();
        node.entity = None;
        node.parent = NULL_NODE;
        node.left = NULL_NODE;
        node.right = NULL_NODE;
        node.height = 0;

        self.node_count += 1;
        index
    }

    fn free_node(&mut self, index: u32) {
        let node = &mut self.nodes[index as usize];
        node.right = self.free_list;
        node.height = -1;
        node.entity = None;
        self.free_list = index;
        self.node_count -= 1;
    }

    /// A node id refers to a live leaf the map knows about.
    fn is_live_leaf(&self, node_id: u32) -> bool {
        let Some(node) = self.nodes.get(node_id as usize) else {
            return false;
        };
        if node.height != 0 {
            return false;
        }
        match node.entity {
            Some(entity) => self.entity_to_node.get(&entity) == Some(&node_id),
            // A freshly allocated leaf mid-insert has no map entry yet;
            // public callers never see that state.
            None => false,
        }
    }

    // ===== INSERTION =====

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        let leaf_aabb = self.nodes[leaf as usize].aabb;

        // Descend, minimising the incremental surface-area cost.
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let node = self.nodes[index as usize];
            let left = node.left;
            let right = node.right;

            let area = node.aabb.surface_area();
            let combined_area = node.aabb.union(&leaf_aabb).surface_area();

            // Cost of creating a new parent here for (node, leaf)
            let cost = 2.0 * combined_area;

            // Minimum cost the leaf inherits by descending past this node
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost_left = self.descent_cost(left, &leaf_aabb) + inheritance_cost;
            let cost_right = self.descent_cost(right, &leaf_aabb) + inheritance_cost;

            if cost < cost_left && cost < cost_right {
                break;
            }

            index = if cost_left < cost_right { left } else { right };
        }

        // Wrap the chosen sibling and the new leaf in a fresh parent.
        let sibling = index;
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.allocate_node();

        let sibling_aabb = self.nodes[sibling as usize].aabb;
        let sibling_height = self.nodes[sibling as usize].height;
        {
            let node = &mut self.nodes[new_parent as usize];
            node.parent = old_parent;
            node.aabb = sibling_aabb.union(&leaf_aabb);
            node.height = sibling_height + 1;
            node.left = sibling;
            node.right = leaf;
        }
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        if old_parent != NULL_NODE {
            if self.nodes[old_parent as usize].left == sibling {
                self.nodes[old_parent as usize].left = new_parent;
            } else {
                self.nodes[old_parent as usize].right = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        self.refit_and_balance(self.nodes[leaf as usize].parent);
    }

    /// Surface-area cost of pushing the leaf into `child`.
    fn descent_cost(&self, child: u32, leaf_aabb: &BoundingBox) -> f32 {
        let node = &self.nodes[child as usize];
        let combined = node.aabb.union(leaf_aabb).surface_area();
        if node.is_leaf() {
            combined
        } else {
            combined - node.aabb.surface_area()
        }
    }

    // ===== REMOVAL =====

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grandparent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].left == leaf {
            self.nodes[parent as usize].right
        } else {
            self.nodes[parent as usize].left
        };

        if grandparent != NULL_NODE {
            // Collapse the parent into the sibling.
            if self.nodes[grandparent as usize].left == parent {
                self.nodes[grandparent as usize].left = sibling;
            } else {
                self.nodes[grandparent as usize].right = sibling;
            }
            self.nodes[sibling as usize].parent = grandparent;
            self.free_node(parent);

            self.refit_and_balance(grandparent);
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    // ===== BALANCING =====

    /// Walk from `start` to the root, balancing each node and
    /// refitting its AABB and height.
    ///
    /// `balance` may push the visited node one level down; refitting it
    /// afterwards and climbing through its (possibly new) parent keeps
    /// the ascent covering every changed ancestor.
    fn refit_and_balance(&mut self, start: u32) {
        let mut index = start;
        while index != NULL_NODE {
            self.balance(index);

            let node = self.nodes[index as usize];
            if !node.is_leaf() {
                let left = self.nodes[node.left as usize];
                let right = self.nodes[node.right as usize];
                let refit = &mut self.nodes[index as usize];
                refit.height = 1 + left.height.max(right.height);
                refit.aabb = left.aabb.union(&right.aabb);
            }

            index = self.nodes[index as usize].parent;
        }
    }

    /// Rebalance the subtree at `i_a` with at most one single or
    /// double rotation. The deeper grandchild is swapped into the
    /// shallower subtree when `|h_left - h_right| > 1`.
    fn balance(&mut self, i_a: u32) {
        let a = self.nodes[i_a as usize];
        if a.is_leaf() || a.height < 2 {
            return;
        }

        let i_b = a.left;
        let i_c = a.right;
        let delta = self.nodes[i_c as usize].height - self.nodes[i_b as usize].height;

        if delta > 1 {
            self.rotate_right_child_up(i_a, i_b, i_c);
        } else if delta < -1 {
            self.rotate_left_child_up(i_a, i_b, i_c);
        }
    }

    /// C (right child of A) moves up; A becomes C's left child.
    fn rotate_right_child_up(&mut self, i_a: u32, i_b: u32, i_c: u32) {
        let i_f = self.nodes[i_c as usize].left;
        let i_g = self.nodes[i_c as usize].right;

        self.nodes[i_c as usize].left = i_a;
        self.nodes[i_c as usize].parent = self.nodes[i_a as usize].parent;
        self.nodes[i_a as usize].parent = i_c;
        self.replace_parent_link(self.nodes[i_c as usize].parent, i_a, i_c);

        let f_height = self.nodes[i_f as usize].height;
        let g_height = self.nodes[i_g as usize].height;

        if f_height > g_height {
            // Double rotation: G descends to A
            self.nodes[i_c as usize].right = i_f;
            self.nodes[i_a as usize].right = i_g;
            self.nodes[i_g as usize].parent = i_a;
            self.refit_pair(i_a, i_b, i_g, i_c, i_f);
        } else {
            // Single rotation: F descends to A
            self.nodes[i_c as usize].right = i_g;
            self.nodes[i_a as usize].right = i_f;
            self.nodes[i_f as usize].parent = i_a;
            self.refit_pair(i_a, i_b, i_f, i_c, i_g);
        }
    }

    /// B (left child of A) moves up; A becomes B's right child.
    fn rotate_left_child_up(&mut self, i_a: u32, i_b: u32, i_c: u32) {
        let i_d = self.nodes[i_b as usize].left;
        let i_e = self.nodes[i_b as usize].right;

        self.nodes[i_b as usize].right = i_a;
        self.nodes[i_b as usize].parent = self.nodes[i_a as usize].parent;
        self.nodes[i_a as usize].parent = i_b;
        self.replace_parent_link(self.nodes[i_b as usize].parent, i_a, i_b);

        let d_height = self.nodes[i_d as usize].height;
        let e_height = self.nodes[i_e as usize].height;

        if d_height > e_height {
            // Single rotation: E descends to A
            self.nodes[i_b as usize].left = i_d;
            self.nodes[i_a as usize].left = i_e;
            self.nodes[i_e as usize].parent = i_a;
            self.refit_pair(i_a, i_c, i_e, i_b, i_d);
        } else {
            // Double rotation: D descends to A
            self.nodes[i_b as usize].left = i_e;
            self.nodes[i_a as usize].left = i_d;
            self.nodes[i_d as usize].parent = i_a;
            self.refit_pair(i_a, i_c, i_d, i_b, i_e);
        }
    }

    /// After a rotation, refit the demoted node from its two children,
    /// then the promoted node from the demoted node and its kept child.
    fn refit_pair(
        &mut self,
        demoted: u32,
        demoted_child_a: u32,
        demoted_child_b: u32,
        promoted: u32,
        promoted_child: u32,
    ) {
        let ca = self.nodes[demoted_child_a as usize];
        let cb = self.nodes[demoted_child_b as usize];
        {
            let node = &mut self.nodes[demoted as usize];
            node.aabb = ca.aabb.union(&cb.aabb);
            node.height = 1 + ca.height.max(cb.height);
        }

        let d = self.nodes[demoted as usize];
        let pc = self.nodes[promoted_child as usize];
        {
            let node = &mut self.nodes[promoted as usize];
            node.aabb = d.aabb.union(&pc.aabb);
            node.height = 1 + d.height.max(pc.height);
        }
    }

    /// Point the former parent of `old_child` at `new_child`; update
    /// the root when there was no parent.
    fn replace_parent_link(&mut self, parent: u32, old_child: u32, new_child: u32) {
        if parent != NULL_NODE {
            if self.nodes[parent as usize].left == old_child {
                self.nodes[parent as usize].left = new_child;
            } else {
                self.nodes[parent as usize].right = new_child;
            }
        } else {
            self.root = new_child;
        }
    }
}

impl Default for DynamicBvh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "dynamic_bvh_tests.rs"]
mod tests;
