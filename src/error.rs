use thiserror::Error;

/// Lookup failure for accessors that must produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key not found")]
    NotFound,
}

/// A structural property the tree failed to uphold, reported by
/// `check_invariants`. Node ids refer to slots in the tree's pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("keys out of order at node {0}")]
    Order(usize),
    #[error("node {child} does not point back to its parent {parent:?}")]
    ParentLink { child: usize, parent: Option<usize> },
    #[error("node {node} stores balance {stored} but its subtrees differ by {actual}")]
    StaleBalance { node: usize, stored: i8, actual: isize },
    #[error("node {node} is out of balance ({balance})")]
    Unbalanced { node: usize, balance: isize },
    #[error("tree reports {reported} entries but {reachable} are reachable")]
    Length { reported: usize, reachable: usize },
}
