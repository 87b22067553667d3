//! An arena-backed red-black tree, used as an ordered set.
//!
//! Conventions used in comments follow Cormen, Leiserson, Rivest and Stein:
//! - The parent of a node `x` is denoted `p(x)`.
//! - `nil` is the shared sentinel standing in for every missing child.
//! - The black-height `bh(x)` is the number of black nodes on any path from `x` down to a `nil`,
//!   not counting `x` itself.
//!
//! The fundamental invariants of a red-black tree are:
//! 1. Every node is either red or black, and `nil` is black.
//! 2. The root is black.
//! 3. A red node has two black children.
//! 4. For every node `x`, all paths from `x` to a descendant `nil` contain `bh(x)` black nodes.
//!
//! Corollaries:
//! 5. A subtree rooted at `x` contains at least `2^bh(x) - 1` nodes.
//!
//!    Proof: by induction on the height of `x`. Each child of `x` has black-height at least
//!    `bh(x) - 1`, so `x` roots at least `2 * (2^(bh(x) - 1) - 1) + 1` nodes. QED
//!
//! 6. A tree with `n` nodes has height at most `2 * log2(n + 1)`.
//!
//!    Proof: by (3), at least half the nodes on any root-to-`nil` path are black, so
//!    `bh(root) >= h / 2`; apply (5). QED
//!
//! Nodes live in a `Vec` and refer to each other by index. Slot 0 always holds `nil`, so every
//! link is a plain index and the fixups below never special-case a missing child.

use core::{borrow::Borrow, cmp::Ordering, fmt, mem, ops::Not};

use log::{debug, trace};

mod debug;
mod error;
mod iter;
mod validate;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use crate::error::InvariantError;
pub use crate::iter::Iter;
pub use crate::validate::Stats;

/// Index of a node slot in the arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct NodeId(usize);

/// The sentinel. Always black, never holds a key.
const NIL: NodeId = NodeId(0);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Links {
    parent: NodeId,
    children: [NodeId; 2],
    color: Color,
}

impl Links {
    const fn detached(color: Color) -> Links {
        Links {
            parent: NIL,
            children: [NIL; 2],
            color,
        }
    }
}

/// An arena slot. `key` is `None` for `nil` and for freed slots.
#[derive(Clone)]
struct Node<K> {
    links: Links,
    key: Option<K>,
}

/// A red-black tree holding a set of distinct, totally ordered keys.
///
/// Inserting a key that is already present is rejected: the tree is left untouched and the key is
/// handed back to the caller. Removing an absent key is a no-op.
///
/// Arena slots vacated by [`remove`](Self::remove) are recycled by later inserts, but each insert
/// writes a fresh node into the slot: nodes themselves are never reused.
///
/// ```
/// use arena_rbtree::RedBlackTree;
///
/// let mut tree = RedBlackTree::new();
/// assert_eq!(tree.insert(5), None);
/// assert_eq!(tree.insert(3), None);
/// assert_eq!(tree.insert(5), Some(5));
///
/// assert!(tree.contains(&3));
/// assert_eq!(tree.remove(&3), Some(3));
/// assert_eq!(tree.remove(&3), None);
/// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [5]);
/// ```
#[derive(Clone)]
pub struct RedBlackTree<K> {
    nodes: Vec<Node<K>>,
    free: Vec<NodeId>,
    root: NodeId,
    len: usize,
}

impl<K> RedBlackTree<K> {
    /// Returns a new empty tree.
    pub fn new() -> RedBlackTree<K> {
        RedBlackTree::with_capacity(0)
    }

    /// Returns a new empty tree with room for `capacity` keys before the arena reallocates.
    pub fn with_capacity(capacity: usize) -> RedBlackTree<K> {
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(Node {
            links: Links::detached(Color::Black),
            key: None,
        });

        RedBlackTree {
            nodes,
            free: Vec::new(),
            root: NIL,
            len: 0,
        }
    }

    /// Returns `true` if the tree contains no keys.
    pub fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            assert_eq!(empty, self.root == NIL);
        }

        empty
    }

    /// Returns the number of keys in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns an iterator over the keys of the tree, in ascending order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(self)
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    ///
    /// An empty tree has height 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = Vec::new();

        if self.root != NIL {
            stack.push((self.root, 1));
        }

        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);

            for child in self.links(node).children {
                if child != NIL {
                    stack.push((child, depth + 1));
                }
            }
        }

        height
    }

    /// Clears the tree, removing all keys.
    ///
    /// Every node is unlinked and freed exactly once; the arena is then shrunk back to the
    /// sentinel alone.
    pub fn clear(&mut self) {
        let freed = self.len;
        let mut cur = self.root;

        while cur != NIL {
            // Descend to the minimum node.
            let (min, min_parent) = self.min_in_subtree(cur);
            let parent = if min_parent != NIL {
                min_parent
            } else {
                self.parent(min)
            };

            let right = self.child(min, Dir::Right);

            // Elevate the node's right child (which may be `nil`).
            self.replace_child_or_set_root(parent, min, right);
            if right != NIL {
                self.set_parent(right, parent);
            }

            drop(self.free_node(min));
            self.len -= 1;

            // If the node had no right child, climb to the parent. If the node had no parent, the
            // tree is empty.
            cur = if right != NIL { right } else { parent };
        }

        debug_assert_eq!(self.root, NIL);
        debug_assert_eq!(self.len, 0);

        self.nodes.truncate(1);
        self.free.clear();
        self.nodes[NIL.0].links = Links::detached(Color::Black);

        debug!("cleared red-black tree, freed {freed} nodes");
    }

    // Arena =================================================================

    fn alloc(&mut self, key: K, parent: NodeId) -> NodeId {
        let node = Node {
            links: Links {
                parent,
                children: [NIL; 2],
                color: Color::Red,
            },
            key: Some(key),
        };

        match self.free.pop() {
            Some(id) => {
                debug_assert!(self.nodes[id.0].key.is_none());
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    // Takes the key out of a node that has already been unlinked from the tree.
    fn free_node(&mut self, id: NodeId) -> K {
        debug_assert_ne!(id, NIL, "the sentinel is never freed");

        let node = &mut self.nodes[id.0];
        node.links = Links::detached(Color::Black);
        let key = node.key.take().expect("freed node must be occupied");
        self.free.push(id);
        key
    }

    // Support methods ========================================================

    #[inline]
    fn links(&self, id: NodeId) -> &Links {
        &self.nodes[id.0].links
    }

    #[inline]
    fn links_mut(&mut self, id: NodeId) -> &mut Links {
        &mut self.nodes[id.0].links
    }

    #[inline]
    fn key(&self, id: NodeId) -> &K {
        self.nodes[id.0]
            .key
            .as_ref()
            .expect("linked node must hold a key")
    }

    #[inline]
    fn parent(&self, id: NodeId) -> NodeId {
        self.links(id).parent
    }

    #[inline]
    fn child(&self, id: NodeId, dir: Dir) -> NodeId {
        self.links(id).children[dir as usize]
    }

    #[inline]
    fn color(&self, id: NodeId) -> Color {
        self.links(id).color
    }

    #[inline]
    fn is_red(&self, id: NodeId) -> bool {
        self.color(id) == Color::Red
    }

    #[inline]
    fn set_parent(&mut self, id: NodeId, parent: NodeId) -> NodeId {
        mem::replace(&mut self.links_mut(id).parent, parent)
    }

    #[inline]
    fn set_child(&mut self, id: NodeId, dir: Dir, child: NodeId) -> NodeId {
        mem::replace(&mut self.links_mut(id).children[dir as usize], child)
    }

    #[inline]
    fn set_color(&mut self, id: NodeId, color: Color) {
        debug_assert!(
            id != NIL || color == Color::Black,
            "the sentinel must stay black"
        );
        self.links_mut(id).color = color;
    }

    #[inline]
    fn which_child(&self, parent: NodeId, child: NodeId) -> Dir {
        if self.child(parent, Dir::Left) == child {
            Dir::Left
        } else {
            debug_assert_eq!(self.child(parent, Dir::Right), child);
            Dir::Right
        }
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent; otherwise
    // the second value is `nil`.
    #[inline]
    fn min_in_subtree(&self, root: NodeId) -> (NodeId, NodeId) {
        let mut parent = NIL;
        let mut cur = root;

        loop {
            let left = self.child(cur, Dir::Left);
            if left == NIL {
                return (cur, parent);
            }
            parent = cur;
            cur = left;
        }
    }

    // Replaces the child link of `parent` pointing at `old_child` with `new_child`, or makes
    // `new_child` the root if `parent` is `nil`.
    //
    // `new_child`'s parent link is not updated.
    #[inline]
    fn replace_child_or_set_root(&mut self, parent: NodeId, old_child: NodeId, new_child: NodeId) {
        if parent == NIL {
            self.root = new_child;
        } else {
            let dir = self.which_child(parent, old_child);
            self.set_child(parent, dir, new_child);
        }
    }

    // Puts the subtree rooted at `new` in the place of the subtree rooted at `old`.
    //
    // `new`'s parent link is always written, even when `new` is `nil`: the delete fixup relies on
    // `p(nil)` to find its way back up the tree.
    fn transplant(&mut self, old: NodeId, new: NodeId) {
        let parent = self.parent(old);
        self.replace_child_or_set_root(parent, old, new);
        self.set_parent(new, parent);
    }

    // Performs a rotation moving `down` in direction `dir`.
    //
    // The `!dir` child of `down`, `up`, takes `down`'s place and `down` becomes the `dir` child
    // of `up`. Colors of affected nodes are not updated.
    //
    //         |                          |
    //        down                        up
    //       /    \       (Left)        /    \
    //      a      up     ------>    down     c
    //            /  \              /    \
    //        across  c            a    across
    //
    fn rotate(&mut self, down: NodeId, dir: Dir) {
        let up = self.child(down, !dir);
        assert_ne!(up, NIL, "rotation requires a child to promote");

        trace!("rotate {dir:?} at {down:?}, promoting {up:?}");

        // `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
        let across = self.child(up, dir);
        self.set_child(down, !dir, across);
        if across != NIL {
            self.set_parent(across, down);
        }

        let parent = self.set_parent(down, up);
        self.set_parent(up, parent);
        self.replace_child_or_set_root(parent, down, up);
        self.set_child(up, dir, down);
    }
}

impl<K: Ord> RedBlackTree<K> {
    /// Returns `true` if the tree contains `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key) != NIL
    }

    /// Returns a reference to the key in the tree equal to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find(key) {
            NIL => None,
            node => Some(self.key(node)),
        }
    }

    fn find<Q>(&self, key: &Q) -> NodeId
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;

        while cur != NIL {
            cur = match key.cmp(self.key(cur).borrow()) {
                Ordering::Less => self.child(cur, Dir::Left),
                Ordering::Equal => return cur,
                Ordering::Greater => self.child(cur, Dir::Right),
            };
        }

        NIL
    }

    /// Inserts `key` into the tree.
    ///
    /// Returns `None` if the key was inserted. If an equal key is already present the tree is not
    /// modified and `key` is returned.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, key: K) -> Option<K> {
        let mut parent = NIL;
        let mut dir = Dir::Left;
        let mut cur = self.root;

        // Descend the tree, looking for a suitable leaf.
        while cur != NIL {
            dir = match key.cmp(self.key(cur)) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Some(key),
                Ordering::Greater => Dir::Right,
            };

            parent = cur;
            cur = self.child(cur, dir);
        }

        let node = self.alloc(key, parent);
        if parent == NIL {
            self.root = node;
        } else {
            self.set_child(parent, dir, node);
        }

        self.rebalance_inserted(node);
        self.len += 1;

        None
    }

    // Performs a bottom-up rebalance of the tree after the insertion of the red leaf `node`.
    //
    // Invariant (3) may be violated between `x` and `p(x)`; all others hold, except that the
    // root may be red.
    fn rebalance_inserted(&mut self, node: NodeId) {
        let mut x = node;

        // The root's parent is `nil`, which is black, so this also stops at the root.
        while self.is_red(self.parent(x)) {
            let parent = self.parent(x);
            // `parent` is red, so it is not the root.
            let grandparent = self.parent(parent);
            let dir = self.which_child(grandparent, parent);
            let uncle = self.child(grandparent, !dir);

            if self.is_red(uncle) {
                trace!("insert fixup at {x:?}: red uncle, recolor and ascend");

                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                x = grandparent;
                continue;
            }

            let mut parent = parent;
            if x == self.child(parent, !dir) {
                trace!("insert fixup at {x:?}: inner grandchild, straighten");

                // Rotate `x` into its parent's place so that it becomes the outer grandchild.
                self.rotate(parent, dir);
                x = parent;
                parent = self.parent(x);
            }

            trace!("insert fixup at {x:?}: outer grandchild, rotate at {grandparent:?}");

            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, !dir);
            break;
        }

        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Removes `key` from the tree, returning the stored key if it was present.
    ///
    /// Removing an absent key leaves the tree untouched.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find(key);
        if node == NIL {
            return None;
        }

        // There are three possible cases:
        //
        // 1. `node` has no left child. Its right subtree (possibly `nil`) takes its place.
        // 2. `node` has no right child. Symmetric to (1).
        // 3. `node` has two children. Its successor[^1] is unlinked, its right child elevated to
        //    replace it, and the successor then takes `node`'s place and color.
        //
        // In every case exactly one node leaves its position, and `replacement` is the subtree
        // that moved up into it. If the color that left was black, every path through
        // `replacement` lacks one black node and the delete fixup must repair invariant (4).
        //
        // [^1]: The successor of a node `a` is the least node in `a`'s right subtree.
        let left = self.child(node, Dir::Left);
        let right = self.child(node, Dir::Right);

        let (replacement, removed_color) = if left == NIL {
            self.transplant(node, right);
            (right, self.color(node))
        } else if right == NIL {
            self.transplant(node, left);
            (left, self.color(node))
        } else {
            let (successor, _) = self.min_in_subtree(right);
            let successor_color = self.color(successor);
            let successor_right = self.child(successor, Dir::Right);

            if self.parent(successor) == node {
                // `successor_right` stays attached to `successor`; only `p(nil)` may need fixing.
                self.set_parent(successor_right, successor);
            } else {
                // Elevate the successor's right child to replace it.
                self.transplant(successor, successor_right);
                self.set_child(successor, Dir::Right, right);
                self.set_parent(right, successor);
            }

            self.transplant(node, successor);
            self.set_child(successor, Dir::Left, left);
            self.set_parent(left, successor);
            let node_color = self.color(node);
            self.set_color(successor, node_color);

            (successor_right, successor_color)
        };

        if removed_color == Color::Black {
            self.rebalance_removed(replacement);
        }

        // The fixup is the only reader of `p(nil)`.
        self.set_parent(NIL, NIL);

        self.len -= 1;
        Some(self.free_node(node))
    }

    // Performs a bottom-up rebalance of the tree after a black node was removed above `node`.
    //
    // `x` carries an extra black: every path through it has one black node fewer than paths
    // that avoid it. The loop pushes the extra black up (or rotates it away) until it lands on a
    // red node, which absorbs it, or on the root, where it is simply dropped.
    fn rebalance_removed(&mut self, node: NodeId) {
        let mut x = node;

        while x != self.root && !self.is_red(x) {
            let parent = self.parent(x);
            let dir = self.which_child(parent, x);
            // `x` is doubly black, so its sibling's subtree has black-height at least 1.
            let mut sibling = self.child(parent, !dir);
            debug_assert_ne!(sibling, NIL);

            if self.is_red(sibling) {
                trace!("delete fixup at {x:?}: red sibling, rotate at {parent:?}");

                self.set_color(sibling, Color::Black);
                self.set_color(parent, Color::Red);
                self.rotate(parent, dir);
                sibling = self.child(parent, !dir);
            }

            let near = self.child(sibling, dir);
            let far = self.child(sibling, !dir);

            if !self.is_red(near) && !self.is_red(far) {
                trace!("delete fixup at {x:?}: black nephews, recolor and ascend");

                self.set_color(sibling, Color::Red);
                x = parent;
                continue;
            }

            if !self.is_red(far) {
                trace!("delete fixup at {x:?}: red near nephew, rotate at {sibling:?}");

                self.set_color(near, Color::Black);
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, !dir);
                sibling = self.child(parent, !dir);
            }

            trace!("delete fixup at {x:?}: red far nephew, rotate at {parent:?}");

            let parent_color = self.color(parent);
            self.set_color(sibling, parent_color);
            self.set_color(parent, Color::Black);
            let far = self.child(sibling, !dir);
            self.set_color(far, Color::Black);
            self.rotate(parent, dir);
            x = self.root;
        }

        self.set_color(x, Color::Black);
    }
}

impl<K> Default for RedBlackTree<K> {
    fn default() -> Self {
        RedBlackTree::new()
    }
}

impl<K> Drop for RedBlackTree<K> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: fmt::Debug> fmt::Debug for RedBlackTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord> FromIterator<K> for RedBlackTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = RedBlackTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord> Extend<K> for RedBlackTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'tree, K> IntoIterator for &'tree RedBlackTree<K> {
    type Item = &'tree K;
    type IntoIter = Iter<'tree, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
