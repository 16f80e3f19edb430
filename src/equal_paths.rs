use crate::bst::NodeRef;

/// Anything shaped like a binary tree node.
pub trait BinaryShape: Sized {
    fn left(&self) -> Option<Self>;
    fn right(&self) -> Option<Self>;
}

impl<'a, K, V> BinaryShape for NodeRef<'a, K, V> {
    fn left(&self) -> Option<Self> {
        NodeRef::left(self)
    }

    fn right(&self) -> Option<Self> {
        NodeRef::right(self)
    }
}

/// True if every leaf below `root` sits at the same depth. Nodes with a single
/// child are not leaves. An empty tree trivially qualifies.
pub fn equal_paths<N: BinaryShape>(root: Option<N>) -> bool {
    let mut leaf_depth = None;
    let mut stack: Vec<(N, usize)> = root.into_iter().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let (left, right) = (node.left(), node.right());
        if left.is_none() && right.is_none() {
            match leaf_depth {
                None => leaf_depth = Some(depth),
                Some(d) if d != depth => return false,
                Some(_) => {}
            }
        }
        stack.extend(left.into_iter().chain(right).map(|n| (n, depth + 1)));
    }
    true
}
