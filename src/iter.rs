use core::iter::FusedIterator;

use crate::{Dir, NodeId, RedBlackTree, NIL};

/// An in-order iterator over the keys of a [`RedBlackTree`].
///
/// The iterator keeps the path of not-yet-yielded ancestors on an explicit stack, so it uses
/// _O(log(n))_ memory and never recurses. Call [`RedBlackTree::iter`] again to restart.
pub struct Iter<'tree, K> {
    tree: &'tree RedBlackTree<K>,

    // Nodes whose left subtree has been entered but which have not been yielded yet. The top of
    // the stack is the next node in order.
    stack: Vec<NodeId>,

    len: usize,
}

impl<'tree, K> Iter<'tree, K> {
    pub(crate) fn new(tree: &'tree RedBlackTree<K>) -> Self {
        let mut iter = Iter {
            tree,
            stack: Vec::new(),
            len: tree.len(),
        };

        iter.descend_left(tree.root);
        iter
    }

    // Upon entering a new subtree, push the path to its minimum element.
    fn descend_left(&mut self, mut cur: NodeId) {
        while cur != NIL {
            self.stack.push(cur);
            cur = self.tree.child(cur, Dir::Left);
        }
    }
}

impl<'tree, K> Iterator for Iter<'tree, K> {
    type Item = &'tree K;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let cur = self.stack.pop()?;

        // The left subtree of `cur` has been exhausted; its successor is the minimum of its right
        // subtree, or failing that the next ancestor on the stack.
        self.descend_left(tree.child(cur, Dir::Right));
        self.len = self.len.saturating_sub(1);

        Some(tree.key(cur))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}

impl<K> Clone for Iter<'_, K> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            stack: self.stack.clone(),
            len: self.len,
        }
    }
}
