use core::fmt;

use crate::{Color, Dir, InvariantError, NodeId, RedBlackTree, NIL};

/// Shape statistics of a [`RedBlackTree`], produced by [`RedBlackTree::validate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    len: usize,
    height: usize,
    black_height: usize,
}

impl Stats {
    /// Returns the number of keys in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of nodes on the longest root-to-leaf path.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the black-height of the root: the number of black nodes on every path from the
    /// root down to the sentinel, counting neither of them. An empty tree reports 0.
    #[inline]
    pub fn black_height(&self) -> usize {
        self.black_height
    }
}

impl<K: Ord + Clone> RedBlackTree<K> {
    /// Validates the tree against the red-black rules:
    ///
    /// * The root and the sentinel are black, and the sentinel holds no key.
    /// * No red node has a red child.
    /// * Every path from a node down to the sentinel has the same number of black nodes.
    /// * Keys are in strictly ascending order.
    /// * Parent links agree with child links.
    ///
    /// Returns the tree's shape statistics if all rules hold.
    pub fn validate(&self) -> Result<Stats, InvariantError<K>> {
        let sentinel = &self.nodes[NIL.0];
        if sentinel.links.color != Color::Black {
            return Err(InvariantError::RedSentinel);
        }
        if sentinel.key.is_some() {
            return Err(InvariantError::SentinelHasKey);
        }

        if self.root != NIL {
            if self.parent(self.root) != NIL {
                return Err(InvariantError::RootHasParent);
            }
            if self.is_red(self.root) {
                return Err(InvariantError::RedRoot);
            }
        }

        let mut found = 0;
        let (black_nodes, height) = self.validate_at(self.root, &mut found)?;
        if found != self.len {
            return Err(InvariantError::LengthMismatch {
                expected: self.len,
                found,
            });
        }

        let mut keys = self.iter();
        if let Some(mut prev) = keys.next() {
            for next in keys {
                if prev >= next {
                    return Err(InvariantError::OutOfOrder {
                        prev: prev.clone(),
                        next: next.clone(),
                    });
                }
                prev = next;
            }
        }

        Ok(Stats {
            len: found,
            height,
            // The root is black here, and `bh(root)` excludes it.
            black_height: black_nodes.saturating_sub(1),
        })
    }

    // Returns the black-height (counting `node` itself) and height of the subtree at `node`.
    fn validate_at(
        &self,
        node: NodeId,
        found: &mut usize,
    ) -> Result<(usize, usize), InvariantError<K>> {
        if node == NIL {
            return Ok((0, 0));
        }

        *found += 1;

        for dir in [Dir::Left, Dir::Right] {
            let child = self.child(node, dir);
            if child == NIL {
                continue;
            }

            if self.parent(child) != node {
                return Err(InvariantError::BrokenParentLink {
                    key: self.key(node).clone(),
                });
            }

            if self.is_red(node) && self.is_red(child) {
                return Err(InvariantError::ConsecutiveReds {
                    key: self.key(node).clone(),
                });
            }
        }

        let (left, left_height) = self.validate_at(self.child(node, Dir::Left), found)?;
        let (right, right_height) = self.validate_at(self.child(node, Dir::Right), found)?;
        if left != right {
            return Err(InvariantError::UnbalancedBlacks {
                key: self.key(node).clone(),
                left,
                right,
            });
        }

        let own = usize::from(!self.is_red(node));
        Ok((left + own, 1 + left_height.max(right_height)))
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self)
    where
        K: fmt::Debug,
    {
        if let Err(error) = self.validate() {
            panic!("red-black tree invariant violated: {error}");
        }
    }
}
