use std::cmp::Ordering;
use std::fmt::{self, Write};

use crate::error::KeyError;
use crate::pool::NodePool;

pub type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A place in the tree a node can hang from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Root,
    Child(NodeId, Side),
}

impl Slot {
    pub fn parent(self) -> Option<NodeId> {
        match self {
            Slot::Root => None,
            Slot::Child(parent, _) => Some(parent),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Search {
    Found(NodeId),
    /// The key is absent; this is where it would be inserted.
    Vacant(Slot),
}

#[derive(Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// height(left) - height(right). Only meaningful to the AVL layer.
    pub(crate) balance: i8,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) fn set_child(&mut self, side: Side, child: Option<NodeId>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }
}

/// What `remove_leaf` hands back: the slot the node used to occupy and its
/// contents.
#[derive(Debug)]
pub struct Detached<K, V> {
    pub slot: Slot,
    pub key: K,
    pub value: V,
}

/// Unbalanced binary search tree over an index arena. Children are owning
/// edges, `parent` is a plain back-reference.
pub struct BinarySearchTree<K, V> {
    pub(crate) pool: NodePool<Node<K, V>>,
    pub(crate) root: Option<NodeId>,
}

impl<K, V> BinarySearchTree<K, V> {
    pub fn new() -> Self {
        BinarySearchTree {
            pool: NodePool::new(),
            root: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BinarySearchTree {
            pool: NodePool::with_capacity(capacity),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        self.pool.clear();
        self.root = None;
    }

    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.root.map(|id| NodeRef { tree: self, id })
    }

    /// Read-only cursor at `id`. Panics if `id` is not a live node.
    pub fn node(&self, id: NodeId) -> NodeRef<'_, K, V> {
        assert!(self.pool.get(id).is_some(), "no live node {}", id);
        NodeRef { tree: self, id }
    }

    pub fn slot_of(&self, id: NodeId) -> Slot {
        match self.pool[id].parent {
            None => Slot::Root,
            Some(p) if self.pool[p].left == Some(id) => Slot::Child(p, Side::Left),
            Some(p) => Slot::Child(p, Side::Right),
        }
    }

    /// Hangs `child` (or nothing) from `slot`, fixing the back-reference.
    pub(crate) fn replace_in_slot(&mut self, slot: Slot, child: Option<NodeId>) {
        match slot {
            Slot::Root => self.root = child,
            Slot::Child(parent, side) => self.pool[parent].set_child(side, child),
        }
        if let Some(c) = child {
            self.pool[c].parent = slot.parent();
        }
    }

    pub fn insert_at(&mut self, slot: Slot, key: K, value: V) -> NodeId {
        let id = self.pool.alloc(Node {
            key,
            value,
            balance: 0,
            parent: slot.parent(),
            left: None,
            right: None,
        });
        match slot {
            Slot::Root => {
                assert!(self.root.is_none(), "insert_at root of a non-empty tree");
                self.root = Some(id);
            }
            Slot::Child(parent, side) => {
                assert!(
                    self.pool[parent].child(side).is_none(),
                    "insert_at occupied slot under node {}",
                    parent
                );
                self.pool[parent].set_child(side, Some(id));
            }
        }
        id
    }

    /// Unlinks a node with at most one child, splicing that child into its
    /// place, and frees it.
    pub fn remove_leaf(&mut self, id: NodeId) -> Detached<K, V> {
        let node = &self.pool[id];
        assert!(
            node.left.is_none() || node.right.is_none(),
            "remove_leaf on node {} with two children",
            id
        );
        let child = node.left.or(node.right);
        let slot = self.slot_of(id);
        self.replace_in_slot(slot, child);
        let Node { key, value, .. } = self.pool.free(id);
        Detached { slot, key, value }
    }

    /// Exchanges the positions of two nodes. Each node keeps its own key and
    /// value; every link that pointed at one now points at the other.
    pub fn swap_nodes(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let a_slot = self.slot_of(a);
        let b_slot = self.slot_of(b);
        let swapped = |x: Option<NodeId>| {
            x.map(|x| {
                if x == a {
                    b
                } else if x == b {
                    a
                } else {
                    x
                }
            })
        };

        let (na, nb) = self.pool.get2_mut(a, b);
        let a_links = (na.parent, na.left, na.right);
        let b_links = (nb.parent, nb.left, nb.right);
        (na.parent, na.left, na.right) = (swapped(b_links.0), swapped(b_links.1), swapped(b_links.2));
        (nb.parent, nb.left, nb.right) = (swapped(a_links.0), swapped(a_links.1), swapped(a_links.2));

        for id in [a, b] {
            for side in [Side::Left, Side::Right] {
                if let Some(c) = self.pool[id].child(side) {
                    self.pool[c].parent = Some(id);
                }
            }
        }

        // Outside parents still point at the old occupant of each slot.
        match b_slot {
            Slot::Child(p, side) if p != a => self.pool[p].set_child(side, Some(a)),
            Slot::Root => self.root = Some(a),
            Slot::Child(..) => {}
        }
        match a_slot {
            Slot::Child(p, side) if p != b => self.pool[p].set_child(side, Some(b)),
            Slot::Root => self.root = Some(b),
            Slot::Child(..) => {}
        }
    }

    /// Leftmost node of the subtree rooted at `id`.
    pub fn min_of(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.pool[id].left {
            id = l;
        }
        id
    }

    /// Rightmost node of the subtree rooted at `id`.
    pub fn max_of(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.pool[id].right {
            id = r;
        }
        id
    }

    pub fn min(&self) -> Option<NodeId> {
        self.root.map(|r| self.min_of(r))
    }

    pub fn max(&self) -> Option<NodeId> {
        self.root.map(|r| self.max_of(r))
    }

    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(l) = self.pool[id].left {
            return Some(self.max_of(l));
        }
        let mut cur = id;
        while let Some(p) = self.pool[cur].parent {
            if self.pool[p].right == Some(cur) {
                return Some(p);
            }
            cur = p;
        }
        None
    }

    pub fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.pool[id].right {
            return Some(self.min_of(r));
        }
        let mut cur = id;
        while let Some(p) = self.pool[cur].parent {
            if self.pool[p].left == Some(cur) {
                return Some(p);
            }
            cur = p;
        }
        None
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.min().map(|id| {
            let node = &self.pool[id];
            (&node.key, &node.value)
        })
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.max().map(|id| {
            let node = &self.pool[id];
            (&node.key, &node.value)
        })
    }

    /// Number of nodes on the longest root-to-leaf path; 0 when empty.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut level: Vec<NodeId> = self.root.into_iter().collect();
        while !level.is_empty() {
            height += 1;
            level = level
                .iter()
                .flat_map(|&id| [self.pool[id].left, self.pool[id].right])
                .flatten()
                .collect();
        }
        height
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: self,
            front: self.min(),
            back: self.max(),
            remaining: self.len(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// In-order dump, one node per line, indented two spaces per level.
    pub fn pretty_print_to_string(&self) -> String
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        fn traverse<K: fmt::Display, V: fmt::Display>(
            idx: Option<NodeId>,
            level: usize,
            pool: &NodePool<Node<K, V>>,
            out: &mut String,
        ) {
            if let Some(i) = idx {
                traverse(pool[i].left, level + 1, pool, out);
                writeln!(out, "{}{}: {}", "  ".repeat(level), &pool[i].key, &pool[i].value)
                    .expect("writing to String cannot fail");
                traverse(pool[i].right, level + 1, pool, out);
            }
        }
        let mut out = String::new();
        traverse(self.root, 0, &self.pool, &mut out);
        out
    }
}

impl<K: Ord, V> BinarySearchTree<K, V> {
    pub fn search(&self, key: &K) -> Search {
        let Some(mut cur) = self.root else {
            return Search::Vacant(Slot::Root);
        };
        loop {
            let node = &self.pool[cur];
            let side = match key.cmp(&node.key) {
                Ordering::Equal => return Search::Found(cur),
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            match node.child(side) {
                Some(next) => cur = next,
                None => return Search::Vacant(Slot::Child(cur, side)),
            }
        }
    }

    pub fn find(&self, key: &K) -> Option<NodeId> {
        match self.search(key) {
            Search::Found(id) => Some(id),
            Search::Vacant(_) => None,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.pool[id].value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(key).map(|id| &mut self.pool[id].value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Like `get`, but a miss is an error rather than `None`.
    pub fn at(&self, key: &K) -> Result<&V, KeyError> {
        self.get(key).ok_or(KeyError::NotFound)
    }
}

impl<K, V> Default for BinarySearchTree<K, V> {
    fn default() -> Self {
        BinarySearchTree::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BinarySearchTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Borrowed view of one node, for walking the shape of a tree.
pub struct NodeRef<'a, K, V> {
    tree: &'a BinarySearchTree<K, V>,
    id: NodeId,
}

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<'a, K, V> NodeRef<'a, K, V> {
    fn node(&self) -> &'a Node<K, V> {
        &self.tree.pool[self.id]
    }

    fn at(&self, id: Option<NodeId>) -> Option<NodeRef<'a, K, V>> {
        id.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &'a K {
        &self.node().key
    }

    pub fn value(&self) -> &'a V {
        &self.node().value
    }

    pub fn balance(&self) -> i8 {
        self.node().balance
    }

    pub fn parent(&self) -> Option<NodeRef<'a, K, V>> {
        self.at(self.node().parent)
    }

    pub fn left(&self) -> Option<NodeRef<'a, K, V>> {
        self.at(self.node().left)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K, V>> {
        self.at(self.node().right)
    }

    pub fn is_leaf(&self) -> bool {
        self.node().left.is_none() && self.node().right.is_none()
    }
}

impl<K: fmt::Debug, V> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("key", self.key())
            .field("balance", &self.balance())
            .finish()
    }
}

/// In-order iterator driven by `successor`/`predecessor`.
pub struct Iter<'a, K, V> {
    tree: &'a BinarySearchTree<K, V>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        self.remaining -= 1;
        self.front = self.tree.successor(id);
        let node = &self.tree.pool[id];
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        self.remaining -= 1;
        self.back = self.tree.predecessor(id);
        let node = &self.tree.pool[id];
        Some((&node.key, &node.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a BinarySearchTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use expect_test::expect;
    use itertools::Itertools;

    fn build(keys: &[i32]) -> BinarySearchTree<i32, i32> {
        let mut tree = BinarySearchTree::new();
        for &k in keys {
            match tree.search(&k) {
                Search::Vacant(slot) => {
                    tree.insert_at(slot, k, k * 10);
                }
                Search::Found(id) => tree.pool[id].value = k * 10,
            }
        }
        tree
    }

    fn id_of(tree: &BinarySearchTree<i32, i32>, key: i32) -> NodeId {
        tree.find(&key).unwrap()
    }

    fn assert_links_consistent(tree: &BinarySearchTree<i32, i32>) {
        if let Some(root) = tree.root {
            assert_eq!(tree.pool[root].parent, None);
        }
        for (k, _) in tree.iter() {
            let id = id_of(tree, *k);
            for c in [tree.pool[id].left, tree.pool[id].right].into_iter().flatten() {
                assert_eq!(tree.pool[c].parent, Some(id), "child {} of {}", c, id);
            }
        }
        assert!(tree.keys().tuple_windows().all(|(a, b)| a < b));
    }

    #[test]
    fn test_unbalanced_insert_shape() {
        let tree = build(&[2, 1, 3, 4]);
        let expect = expect![[r#"
              1: 10
            2: 20
              3: 30
                4: 40
        "#]];
        expect.assert_eq(&tree.pretty_print_to_string());
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_search_reports_slot() {
        let tree = build(&[5, 3, 8]);
        let three = id_of(&tree, 3);
        assert_eq!(tree.search(&4), Search::Vacant(Slot::Child(three, Side::Right)));
        assert_eq!(tree.search(&8), Search::Found(id_of(&tree, 8)));
        let empty: BinarySearchTree<i32, i32> = BinarySearchTree::new();
        assert_eq!(empty.search(&1), Search::Vacant(Slot::Root));
    }

    #[test]
    fn test_predecessor_successor() {
        let tree = build(&[50, 30, 70, 20, 40, 60, 80, 35]);
        let succ = |k| tree.successor(id_of(&tree, k)).map(|id| tree.pool[id].key);
        let pred = |k| tree.predecessor(id_of(&tree, k)).map(|id| tree.pool[id].key);
        assert_eq!(succ(40), Some(50));
        assert_eq!(succ(30), Some(35));
        assert_eq!(succ(80), None);
        assert_eq!(pred(50), Some(40));
        assert_eq!(pred(35), Some(30));
        assert_eq!(pred(20), None);
    }

    #[test]
    fn test_iter_both_ends() {
        let tree = build(&[4, 2, 6, 1, 3, 5, 7]);
        assert_eq!(tree.keys().copied().collect_vec(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(tree.keys().rev().copied().collect_vec(), vec![7, 6, 5, 4, 3, 2, 1]);
        let mut it = tree.keys();
        assert_eq!(it.next(), Some(&1));
        assert_eq!(it.next_back(), Some(&7));
        assert_eq!(it.by_ref().count(), 5);
        assert_eq!(it.next(), None);
        assert_eq!(tree.first_key_value(), Some((&1, &10)));
        assert_eq!(tree.last_key_value(), Some((&7, &70)));
    }

    #[test]
    fn test_remove_leaf_splices_child() {
        let mut tree = build(&[5, 3, 8, 1]);
        let three = id_of(&tree, 3);
        let detached = tree.remove_leaf(three);
        assert_eq!(detached.key, 3);
        assert_eq!(detached.slot, Slot::Child(id_of(&tree, 5), Side::Left));
        let expect = expect![[r#"
              1: 10
            5: 50
              8: 80
        "#]];
        expect.assert_eq(&tree.pretty_print_to_string());
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_remove_leaf_root() {
        let mut tree = build(&[5, 8]);
        let detached = tree.remove_leaf(id_of(&tree, 5));
        assert_eq!(detached.slot, Slot::Root);
        assert_eq!(tree.root().map(|r| *r.key()), Some(8));
        tree.remove_leaf(id_of(&tree, 8));
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    #[should_panic(expected = "two children")]
    fn test_remove_leaf_rejects_two_children() {
        let mut tree = build(&[5, 3, 8]);
        let five = id_of(&tree, 5);
        tree.remove_leaf(five);
    }

    #[test]
    fn test_swap_nodes_distant() {
        let mut tree = build(&[50, 30, 70, 20, 40, 60, 80]);
        let (a, b) = (id_of(&tree, 30), id_of(&tree, 80));
        tree.swap_nodes(a, b);
        // Keys travel with the node, so the order is deliberately broken.
        let expect = expect![[r#"
                20: 200
              80: 800
                40: 400
            50: 500
                60: 600
              70: 700
                30: 300
        "#]];
        expect.assert_eq(&tree.pretty_print_to_string());
        tree.swap_nodes(a, b);
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_swap_nodes_parent_and_child() {
        let mut tree = build(&[50, 30, 70, 20, 40]);
        let (a, b) = (id_of(&tree, 50), id_of(&tree, 30));
        tree.swap_nodes(a, b);
        assert_eq!(tree.root, Some(b));
        assert_eq!(tree.pool[b].left, Some(a));
        assert_eq!(tree.pool[a].parent, Some(b));
        assert_eq!(tree.pool[a].right.map(|id| tree.pool[id].key), Some(40));
        tree.swap_nodes(b, a);
        assert_eq!(tree.root, Some(a));
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_swap_with_predecessor_then_remove() {
        let mut tree = build(&[50, 30, 70, 20, 40, 35]);
        let target = id_of(&tree, 50);
        let pred = tree.predecessor(target).unwrap();
        assert_eq!(tree.pool[pred].key, 40);
        tree.swap_nodes(target, pred);
        let detached = tree.remove_leaf(target);
        assert_eq!(detached.key, 50);
        assert_eq!(tree.keys().copied().collect_vec(), vec![20, 30, 35, 40, 70]);
        assert_eq!(tree.root().map(|r| *r.key()), Some(40));
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_at_reports_missing_key() {
        let tree = build(&[1]);
        assert_eq!(tree.at(&1), Ok(&10));
        assert_eq!(tree.at(&2), Err(KeyError::NotFound));
    }

    #[test]
    fn test_debug_is_map() {
        let tree = build(&[2, 1]);
        assert_eq!(format!("{:?}", tree), "{1: 10, 2: 20}");
    }
}
