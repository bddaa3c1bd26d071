use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use tracing::{debug, trace};

use super::NodeId;
use crate::prelude::*;

/// A node of a [`SplayIndex`]: the shared block plus the tree links owned by this index.
#[derive(Debug, Clone, PartialEq)]
pub struct SplayNode {
    block: Arc<Block>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

impl SplayNode {
    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// The restructuring applied to a node in one splay iteration, named after the side the node and
/// its parent hang from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Left child of the root.
    Zig,
    /// Right child of the root.
    Zag,
    /// Left child of a left child.
    ZigZig,
    /// Right child of a right child.
    ZagZag,
    /// Right child of a left child.
    ZigZag,
    /// Left child of a right child.
    ZagZig,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Zig => "zig",
            Step::Zag => "zag",
            Step::ZigZig => "zig-zig",
            Step::ZagZag => "zag-zag",
            Step::ZigZag => "zig-zag",
            Step::ZagZig => "zag-zig",
        })
    }
}

/// A self-adjusting binary search tree of blocks, ordered by block identifier.
///
/// Nodes live in an arena and refer to each other through [`NodeId`] handles, so a rotation only
/// rewrites handles. Inserting a block, or finding one, moves its node to the root; recently
/// touched blocks are therefore cheap to reach again.
///
/// Two details are kept on purpose:
///
/// * Duplicate identifiers are not rejected. Descent goes left only on a strictly smaller key, so
///   a duplicate lands in the right subtree of its twin.
/// * A search that misses does not splay anything; the tree is left exactly as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplayIndex {
    nodes: Vec<SplayNode>,
    root: Option<NodeId>,
}

impl SplayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The block currently at the root: the last one inserted or found.
    pub fn root(&self) -> Option<&Arc<Block>> {
        self.root.map(|id| &self.node(id).block)
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    /// Panics if `id` was not issued by this index.
    pub fn node(&self, id: NodeId) -> &SplayNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut pending: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();

        while let Some((id, depth)) = pending.pop() {
            height = height.max(depth);
            let node = self.node(id);
            pending.extend(node.left.map(|child| (child, depth + 1)));
            pending.extend(node.right.map(|child| (child, depth + 1)));
        }

        height
    }

    /// Blocks in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Block>> + '_ {
        InOrder {
            index: self,
            stack: Vec::new(),
            cursor: self.root,
        }
    }

    pub fn insert(&mut self, block: Arc<Block>) -> NodeId {
        let key = block.id();
        let mut parent = None;
        let mut cursor = self.root;

        while let Some(current) = cursor {
            parent = Some(current);
            cursor = if key < self.key(current) {
                self.node(current).left
            } else {
                self.node(current).right
            };
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(SplayNode {
            block,
            left: None,
            right: None,
            parent,
        });

        match parent {
            None => self.root = Some(id),
            Some(parent) if key < self.key(parent) => self.node_mut(parent).left = Some(id),
            Some(parent) => self.node_mut(parent).right = Some(id),
        }

        self.splay(id);
        debug!(block = key, size = self.len(), "inserted block into splay index");

        id
    }

    /// Finds the block with identifier `key`, splaying it to the root on a hit.
    pub fn search(&mut self, key: u64) -> Option<Arc<Block>> {
        let Some(id) = self.find(key) else {
            trace!(block = key, "splay index miss");
            return None;
        };

        self.splay(id);
        trace!(block = key, "splay index hit");

        Some(Arc::clone(&self.node(id).block))
    }

    fn find(&self, key: u64) -> Option<NodeId> {
        let mut cursor = self.root;

        while let Some(current) = cursor {
            let current_key = self.key(current);

            cursor = if key < current_key {
                self.node(current).left
            } else if key > current_key {
                self.node(current).right
            } else {
                return Some(current);
            };
        }

        None
    }

    fn key(&self, id: NodeId) -> u64 {
        self.node(id).block.id()
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SplayNode {
        &mut self.nodes[id.0]
    }

    fn is_left_child(&self, child: NodeId, parent: NodeId) -> bool {
        self.node(parent).left == Some(child)
    }

    fn step(&self, x: NodeId) -> Option<Step> {
        let parent = self.node(x).parent?;
        let x_is_left = self.is_left_child(x, parent);

        let step = match self.node(parent).parent {
            None if x_is_left => Step::Zig,
            None => Step::Zag,
            Some(grandparent) => match (x_is_left, self.is_left_child(parent, grandparent)) {
                (true, true) => Step::ZigZig,
                (false, false) => Step::ZagZag,
                (false, true) => Step::ZigZag,
                (true, false) => Step::ZagZig,
            },
        };

        Some(step)
    }

    fn splay(&mut self, x: NodeId) {
        while let Some(step) = self.step(x) {
            trace!(block = self.key(x), %step, "splay step");

            let parent = self.parent_of(x);

            match step {
                Step::Zig => self.rotate_right(parent),
                Step::Zag => self.rotate_left(parent),
                Step::ZigZig => {
                    self.rotate_right(self.parent_of(parent));
                    self.rotate_right(parent);
                }
                Step::ZagZag => {
                    self.rotate_left(self.parent_of(parent));
                    self.rotate_left(parent);
                }
                Step::ZigZag => {
                    self.rotate_left(parent);
                    self.rotate_right(self.parent_of(x));
                }
                Step::ZagZig => {
                    self.rotate_right(parent);
                    self.rotate_left(self.parent_of(x));
                }
            }
        }
    }

    fn parent_of(&self, id: NodeId) -> NodeId {
        match self.node(id).parent {
            Some(parent) => parent,
            None => unreachable!("splay index node {id:?} expected to have a parent"),
        }
    }

    /// Promotes the right child of `x` into its place.
    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.node(x).right else {
            unreachable!("splay index rotated {x:?} left without a right child");
        };

        let moved = self.node(y).left;
        self.node_mut(x).right = moved;
        if let Some(moved) = moved {
            self.node_mut(moved).parent = Some(x);
        }

        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, y);

        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
    }

    /// Promotes the left child of `x` into its place.
    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.node(x).left else {
            unreachable!("splay index rotated {x:?} right without a left child");
        };

        let moved = self.node(y).right;
        self.node_mut(x).left = moved;
        if let Some(moved) = moved {
            self.node_mut(moved).parent = Some(x);
        }

        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, y);

        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            None => self.root = Some(new),
            Some(parent) if self.is_left_child(old, parent) => self.node_mut(parent).left = Some(new),
            Some(parent) => self.node_mut(parent).right = Some(new),
        }
    }
}

impl BlockIndex for SplayIndex {
    fn insert(&mut self, block: Arc<Block>) {
        SplayIndex::insert(self, block);
    }

    fn search(&mut self, id: u64) -> Option<Arc<Block>> {
        SplayIndex::search(self, id)
    }

    fn len(&self) -> usize {
        SplayIndex::len(self)
    }
}

struct InOrder<'a> {
    index: &'a SplayIndex,
    stack: Vec<NodeId>,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for InOrder<'a> {
    type Item = &'a Arc<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.cursor {
            self.stack.push(id);
            self.cursor = self.index.node(id).left;
        }

        let id = self.stack.pop()?;
        self.cursor = self.index.node(id).right;

        Some(&self.index.node(id).block)
    }
}

#[cfg(all(
    test,
    any(feature = "sha2", feature = "blake2", feature = "blake3")
))]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::{prop_assert_does_not_change, testing::*};

    crate::test_block_index_properties!(SplayIndex);

    fn index_of(ids: &[u64]) -> SplayIndex {
        let mut index = SplayIndex::new();
        for block in blocks(ids).unwrap() {
            index.insert(block);
        }
        index
    }

    /// Renders the tree as `(left key right)`, with `-` for a missing child and bare keys for leaves.
    fn shape(index: &SplayIndex) -> String {
        fn render(index: &SplayIndex, id: Option<NodeId>) -> String {
            let Some(id) = id else {
                return "-".to_string();
            };
            let node = index.node(id);

            if node.left.is_none() && node.right.is_none() {
                node.block.id().to_string()
            } else {
                format!(
                    "({} {} {})",
                    render(index, node.left),
                    node.block.id(),
                    render(index, node.right)
                )
            }
        }

        render(index, index.root)
    }

    /// Every child points back at its parent, the root has none, and every node is reachable.
    fn links_are_consistent(index: &SplayIndex) -> bool {
        let Some(root) = index.root else {
            return index.is_empty();
        };

        let mut reached = 0;
        let mut pending = vec![root];

        if index.node(root).parent.is_some() {
            return false;
        }

        while let Some(id) = pending.pop() {
            reached += 1;
            for child in [index.node(id).left, index.node(id).right].into_iter().flatten() {
                if index.node(child).parent != Some(id) {
                    return false;
                }
                pending.push(child);
            }
        }

        reached == index.len()
    }

    fn ids(index: &SplayIndex) -> Vec<u64> {
        index.iter().map(|block| block.id()).collect()
    }

    #[test]
    fn test_empty_index() {
        let mut index = SplayIndex::new();

        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
        assert!(index.root().is_none());
        assert!(index.search(1).is_none());
    }

    #[test]
    fn test_insert_splays_new_block_to_root() {
        let mut index = index_of(&[10, 20, 5]);
        assert_eq!(index.root().map(|b| b.id()), Some(5));

        index.insert(blocks(&[15]).unwrap().remove(0));
        assert_eq!(index.root().map(|b| b.id()), Some(15));
        assert_eq!(ids(&index), vec![5, 10, 15, 20]);
        assert!(links_are_consistent(&index));
    }

    #[test]
    fn test_zag_then_zag_on_ascending_inserts() {
        let index = index_of(&[1, 2, 3]);
        assert_eq!(shape(&index), "((1 2 -) 3 -)");
    }

    #[test]
    fn test_zig_then_zig_on_descending_inserts() {
        let index = index_of(&[3, 2, 1]);
        assert_eq!(shape(&index), "(- 1 (- 2 3))");
    }

    #[test]
    fn test_zig_zig_on_search() {
        let mut index = index_of(&[1, 2, 3]);

        assert_eq!(index.step(index.find(1).unwrap()), Some(Step::ZigZig));
        index.search(1);

        assert_eq!(shape(&index), "(- 1 (- 2 3))");
        assert!(links_are_consistent(&index));
    }

    #[test]
    fn test_zag_zag_on_search() {
        let mut index = index_of(&[3, 2, 1]);

        assert_eq!(index.step(index.find(3).unwrap()), Some(Step::ZagZag));
        index.search(3);

        assert_eq!(shape(&index), "((1 2 -) 3 -)");
        assert!(links_are_consistent(&index));
    }

    #[test]
    fn test_zig_zag_on_insert() {
        // 5(L:1) then 3 lands as the right child of 1.
        let index = index_of(&[1, 5, 3]);
        assert_eq!(shape(&index), "(1 3 5)");
        assert!(links_are_consistent(&index));
    }

    #[test]
    fn test_zag_zig_on_insert() {
        // 1(R:5) then 3 lands as the left child of 5.
        let index = index_of(&[5, 1, 3]);
        assert_eq!(shape(&index), "(1 3 5)");
        assert!(links_are_consistent(&index));
    }

    #[test]
    fn test_step_classification() {
        let index = index_of(&[1, 2, 3]);
        let root = index.root_id().unwrap();
        let two = index.find(2).unwrap();

        assert_eq!(index.step(root), None);
        assert_eq!(index.step(two), Some(Step::Zig));

        let index = index_of(&[3, 2, 1]);
        assert_eq!(index.step(index.find(2).unwrap()), Some(Step::Zag));
    }

    #[test]
    fn test_duplicates_go_right_and_are_kept() {
        let mut index = index_of(&[5, 5]);

        assert_eq!(index.len(), 2);
        assert_eq!(ids(&index), vec![5, 5]);
        assert_eq!(shape(&index), "(5 5 -)");

        let root = Arc::clone(index.root().unwrap());
        assert!(Arc::ptr_eq(&index.search(5).unwrap(), &root));
    }

    #[test]
    fn test_miss_does_not_splay() {
        let mut index = index_of(&[10, 20, 5, 15, 12]);
        let before = index.clone();

        assert!(index.search(13).is_none());
        assert_eq!(index, before);
    }

    #[proptest(fork = false)]
    fn test_in_order_is_sorted_after_any_operations(
        #[strategy(block_ids(0..60))] inserts: Vec<u64>,
        #[strategy(block_ids(0..60))] searches: Vec<u64>,
    ) {
        let mut index = index_of(&inserts);
        for id in searches {
            index.search(id);
        }

        let in_order = ids(&index);
        let mut sorted = inserts.clone();
        sorted.sort();

        prop_assert_eq!(in_order, sorted);
        prop_assert!(links_are_consistent(&index));
    }

    #[proptest(fork = false)]
    fn test_inserted_block_becomes_root(
        #[strategy(block_ids(0..60))] existing: Vec<u64>,
        id: u64,
    ) {
        let mut index = index_of(&existing);
        let block = blocks(&[id])?.remove(0);

        index.insert(Arc::clone(&block));

        prop_assert!(Arc::ptr_eq(index.root().unwrap(), &block));
        prop_assert!(links_are_consistent(&index));
    }

    #[proptest(fork = false)]
    fn test_hit_becomes_root(
        #[strategy(block_ids(1..60))] existing: Vec<u64>,
        index_hint: prop::sample::Index,
    ) {
        let mut index = index_of(&existing);
        let wanted = existing[index_hint.index(existing.len())];

        let found = index.search(wanted);

        prop_assert_eq!(found.map(|b| b.id()), Some(wanted));
        prop_assert_eq!(index.root().map(|b| b.id()), Some(wanted));
        prop_assert!(links_are_consistent(&index));
    }

    #[proptest(fork = false)]
    fn test_miss_leaves_tree_unchanged(
        #[strategy(block_ids(0..60))] existing: Vec<u64>,
        #[strategy(missing_id())] missing: u64,
    ) {
        let mut index = index_of(&existing);

        prop_assert_does_not_change!(index.search(missing), index);
    }
}
