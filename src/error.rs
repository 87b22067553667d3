use thiserror::Error;

/// A broken red-black tree invariant, as reported by [`RedBlackTree::validate`].
///
/// None of these can be produced through the public API; seeing one means the tree is corrupt.
///
/// [`RedBlackTree::validate`]: crate::RedBlackTree::validate
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantError<K> {
    /// The root node is red.
    #[error("root node is red")]
    RedRoot,
    /// The root node has a parent.
    #[error("root node has a parent")]
    RootHasParent,
    /// The sentinel was recolored red.
    #[error("sentinel is red")]
    RedSentinel,
    /// The sentinel holds a key.
    #[error("sentinel holds a key")]
    SentinelHasKey,
    /// A child's parent link does not point back at the node holding `key`.
    #[error("child of {key:?} does not link back to it")]
    BrokenParentLink { key: K },
    /// The red node holding `key` has a red child.
    #[error("red node {key:?} has a red child")]
    ConsecutiveReds { key: K },
    /// The subtrees of the node holding `key` have different black-heights.
    #[error("subtrees of {key:?} have black-heights {left} and {right}")]
    UnbalancedBlacks { key: K, left: usize, right: usize },
    /// In-order traversal yielded `next` right after `prev`, but `prev < next` does not hold.
    #[error("keys out of order: {prev:?} precedes {next:?}")]
    OutOfOrder { prev: K, next: K },
    /// The number of reachable nodes differs from the tree's recorded length.
    #[error("tree records {expected} keys but {found} are reachable")]
    LengthMismatch { expected: usize, found: usize },
}
