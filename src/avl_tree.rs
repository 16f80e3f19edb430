use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use crate::bst::{BinarySearchTree, Iter, NodeId, NodeRef, Search, Side, Slot};
use crate::error::{InvariantViolation, KeyError};

pub trait ConfigT {
    /// Trace rotations and splices to the debug writer (or stderr).
    const DEBUG: bool;
    /// Run `check_invariants` after every mutation and panic on failure.
    const CHECK_INVARIANTS: bool;
}

pub struct BalancedConfig {}
pub struct BalancedConfigDebug {}

impl ConfigT for BalancedConfig {
    const DEBUG: bool = false;
    const CHECK_INVARIANTS: bool = false;
}

impl ConfigT for BalancedConfigDebug {
    const DEBUG: bool = true;
    const CHECK_INVARIANTS: bool = true;
}

macro_rules! debug {
    ($writer:expr, $($arg:tt)+) => {
        if Config::DEBUG {
            match $writer {
                Some(ref w) => {
                    use std::fmt::Write as _;
                    let _ = writeln!(w.borrow_mut(), $($arg)+);
                }
                None => {
                    eprintln!($($arg)+);
                }
            }
        }
    };
}

// Change in a node's balance when the subtree on `side` grows by one level.
fn growth(side: Side) -> i8 {
    match side {
        Side::Left => 1,
        Side::Right => -1,
    }
}

/// Height-balanced search tree. Balance factors are kept incrementally as
/// height(left) - height(right) and stay within [-1, 1] between calls.
pub struct AvlTree<K, V, Config: ConfigT> {
    tree: BinarySearchTree<K, V>,
    debug_writer: Option<RefCell<Box<dyn fmt::Write>>>,
    _config: PhantomData<Config>,
}

pub type AvlMap<K, V> = AvlTree<K, V, BalancedConfig>;
pub type AvlMapDebug<K, V> = AvlTree<K, V, BalancedConfigDebug>;

impl<K, V, Config: ConfigT> AvlTree<K, V, Config> {
    pub fn new() -> Self {
        Self::new_with_debug_writer::<String>(None)
    }

    pub fn new_with_debug_writer<Writer: fmt::Write + 'static>(
        debug_writer: Option<Writer>,
    ) -> Self {
        let debug_writer = match debug_writer {
            None => None,
            Some(w) => {
                let b: Box<dyn fmt::Write> = Box::new(w);
                Some(RefCell::new(b))
            }
        };
        AvlTree {
            tree: BinarySearchTree::new(),
            debug_writer,
            _config: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.tree.root()
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_, K, V> {
        self.tree.node(id)
    }

    /// The underlying search tree, for read-only walks.
    pub fn as_bst(&self) -> &BinarySearchTree<K, V> {
        &self.tree
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.tree.keys()
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.tree.values()
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first_key_value()
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last_key_value()
    }

    pub fn pretty_print_to_string(&self) -> String
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        self.tree.pretty_print_to_string()
    }

    /// Makes `node`'s right child the root of this subtree. Returns the new
    /// subtree root.
    fn rotate_left(&mut self, node: NodeId) -> NodeId {
        let pivot = match self.tree.pool[node].right {
            Some(r) => r,
            None => panic!("rotate_left on node {} without a right child", node),
        };
        debug!(self.debug_writer, "rotate_left at {} (pivot {})", node, pivot);
        let slot = self.tree.slot_of(node);
        let inner = self.tree.pool[pivot].left;

        self.tree.pool[node].right = inner;
        if let Some(inner) = inner {
            self.tree.pool[inner].parent = Some(node);
        }
        self.tree.pool[pivot].left = Some(node);
        self.tree.pool[node].parent = Some(pivot);
        self.tree.replace_in_slot(slot, Some(pivot));

        let (n, p) = self.tree.pool.get2_mut(node, pivot);
        n.balance += 1 - p.balance.min(0);
        p.balance += 1 + n.balance.max(0);
        pivot
    }

    /// Mirror of `rotate_left`.
    fn rotate_right(&mut self, node: NodeId) -> NodeId {
        let pivot = match self.tree.pool[node].left {
            Some(l) => l,
            None => panic!("rotate_right on node {} without a left child", node),
        };
        debug!(self.debug_writer, "rotate_right at {} (pivot {})", node, pivot);
        let slot = self.tree.slot_of(node);
        let inner = self.tree.pool[pivot].right;

        self.tree.pool[node].left = inner;
        if let Some(inner) = inner {
            self.tree.pool[inner].parent = Some(node);
        }
        self.tree.pool[pivot].right = Some(node);
        self.tree.pool[node].parent = Some(pivot);
        self.tree.replace_in_slot(slot, Some(pivot));

        let (n, p) = self.tree.pool.get2_mut(node, pivot);
        n.balance -= 1 + p.balance.max(0);
        p.balance -= 1 - n.balance.min(0);
        pivot
    }

    /// Restores balance at a node sitting at +2 or -2 and returns whichever
    /// node now roots that subtree. Nodes already in range are returned as is.
    fn rebalance(&mut self, z: NodeId) -> NodeId {
        let balance = self.tree.pool[z].balance;
        if balance > 1 {
            let y = match self.tree.pool[z].left {
                Some(y) => y,
                None => panic!("node {} is left-heavy without a left child", z),
            };
            if self.tree.pool[y].balance < 0 {
                debug!(self.debug_writer, "left-right case at {}", z);
                self.rotate_left(y);
            } else {
                debug!(self.debug_writer, "left-left case at {}", z);
            }
            return self.rotate_right(z);
        }
        if balance < -1 {
            let y = match self.tree.pool[z].right {
                Some(y) => y,
                None => panic!("node {} is right-heavy without a right child", z),
            };
            if self.tree.pool[y].balance > 0 {
                debug!(self.debug_writer, "right-left case at {}", z);
                self.rotate_right(y);
            } else {
                debug!(self.debug_writer, "right-right case at {}", z);
            }
            return self.rotate_left(z);
        }
        z
    }

    /// Walks up from the parent of a freshly attached leaf. One rotation is
    /// always enough after an insert.
    fn rebalance_after_insert(&mut self, mut node: NodeId, mut side: Side) {
        loop {
            let balance = {
                let n = &mut self.tree.pool[node];
                n.balance += growth(side);
                n.balance
            };
            match balance {
                0 => return,
                1 | -1 => match self.tree.slot_of(node) {
                    Slot::Root => return,
                    Slot::Child(parent, s) => {
                        node = parent;
                        side = s;
                    }
                },
                _ => {
                    self.rebalance(node);
                    return;
                }
            }
        }
    }

    /// Walks up from the parent of a spliced-out node. Rotations here may
    /// shorten the subtree, so the walk carries on past them until some
    /// subtree keeps its height.
    fn rebalance_after_remove(&mut self, mut node: NodeId, mut side: Side) {
        loop {
            let balance = {
                let n = &mut self.tree.pool[node];
                n.balance -= growth(side);
                n.balance
            };
            let top = match balance {
                1 | -1 => return,
                0 => node,
                _ => {
                    let top = self.rebalance(node);
                    if self.tree.pool[top].balance != 0 {
                        return;
                    }
                    top
                }
            };
            match self.tree.slot_of(top) {
                Slot::Root => return,
                Slot::Child(parent, s) => {
                    node = parent;
                    side = s;
                }
            }
        }
    }

    /// Exchanges the positions of two nodes and their balance factors, so each
    /// position keeps the balance that describes it.
    fn node_swap(&mut self, a: NodeId, b: NodeId) {
        debug!(self.debug_writer, "swap {} with {}", a, b);
        self.tree.swap_nodes(a, b);
        let (x, y) = self.tree.pool.get2_mut(a, b);
        std::mem::swap(&mut x.balance, &mut y.balance);
    }

    /// Checks ordering, parent back-links and every stored balance factor
    /// against the real subtree heights.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation>
    where
        K: Ord,
    {
        fn walk<K: Ord, V>(
            tree: &BinarySearchTree<K, V>,
            id: NodeId,
            lo: Option<&K>,
            hi: Option<&K>,
            count: &mut usize,
        ) -> Result<usize, InvariantViolation> {
            let node = &tree.pool[id];
            *count += 1;
            if lo.is_some_and(|lo| *lo >= node.key) || hi.is_some_and(|hi| *hi <= node.key) {
                return Err(InvariantViolation::Order(id));
            }
            let mut heights = [0usize; 2];
            for (i, child) in [node.left, node.right].into_iter().enumerate() {
                if let Some(c) = child {
                    if tree.pool[c].parent != Some(id) {
                        return Err(InvariantViolation::ParentLink {
                            child: c,
                            parent: tree.pool[c].parent,
                        });
                    }
                    let (lo, hi) = if i == 0 {
                        (lo, Some(&node.key))
                    } else {
                        (Some(&node.key), hi)
                    };
                    heights[i] = walk(tree, c, lo, hi, count)?;
                }
            }
            let actual = heights[0] as isize - heights[1] as isize;
            if actual != node.balance as isize {
                return Err(InvariantViolation::StaleBalance {
                    node: id,
                    stored: node.balance,
                    actual,
                });
            }
            if actual.abs() > 1 {
                return Err(InvariantViolation::Unbalanced {
                    node: id,
                    balance: actual,
                });
            }
            Ok(heights[0].max(heights[1]) + 1)
        }

        let mut count = 0;
        if let Some(root) = self.tree.root {
            if self.tree.pool[root].parent.is_some() {
                return Err(InvariantViolation::ParentLink {
                    child: root,
                    parent: self.tree.pool[root].parent,
                });
            }
            walk(&self.tree, root, None, None, &mut count)?;
        }
        if count != self.len() {
            return Err(InvariantViolation::Length {
                reported: self.len(),
                reachable: count,
            });
        }
        Ok(())
    }
}

impl<K: Ord, V, Config: ConfigT> AvlTree<K, V, Config> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    pub fn at(&self, key: &K) -> Result<&V, KeyError> {
        self.tree.at(key)
    }

    /// Inserts `key`, or overwrites its value in place if it is already
    /// present. Returns the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let slot = match self.tree.search(&key) {
            Search::Found(id) => {
                debug!(self.debug_writer, "overwrite value at {}", id);
                return Some(std::mem::replace(&mut self.tree.pool[id].value, value));
            }
            Search::Vacant(slot) => slot,
        };
        let id = self.tree.insert_at(slot, key, value);
        debug!(self.debug_writer, "insert {} under {:?}", id, slot);
        if let Slot::Child(parent, side) = slot {
            self.rebalance_after_insert(parent, side);
        }
        self.after_mutation();
        None
    }

    /// Removes `key` if present. Absent keys leave the tree untouched.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let Some(id) = self.tree.find(key) else {
            debug!(self.debug_writer, "remove: key absent");
            return None;
        };
        let node = &self.tree.pool[id];
        if let (Some(left), Some(_)) = (node.left, node.right) {
            let pred = self.tree.max_of(left);
            self.node_swap(id, pred);
        }
        let detached = self.tree.remove_leaf(id);
        debug!(self.debug_writer, "splice {} from {:?}", id, detached.slot);
        if let Slot::Child(parent, side) = detached.slot {
            self.rebalance_after_remove(parent, side);
        }
        self.after_mutation();
        Some(detached.value)
    }

    fn after_mutation(&self) {
        if Config::CHECK_INVARIANTS {
            if let Err(e) = self.check_invariants() {
                panic!("AVL invariant violated: {}", e);
            }
        }
    }
}

impl<K, V, Config: ConfigT> Default for AvlTree<K, V, Config> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, Config: ConfigT> fmt::Debug for AvlTree<K, V, Config> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

impl<K: Ord, V, Config: ConfigT> FromIterator<(K, V)> for AvlTree<K, V, Config> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V, Config: ConfigT> Extend<(K, V)> for AvlTree<K, V, Config> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, Config: ConfigT> IntoIterator for &'a AvlTree<K, V, Config> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
