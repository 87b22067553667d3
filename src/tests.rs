use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;
use simplelog::{Config, LevelFilter, TestLogger};

use crate::model;

use super::*;

fn init_logging() {
    // Several tests may race to install the logger; only the first one wins.
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

fn tree_of(keys: &[u32]) -> RedBlackTree<u32> {
    let mut tree = RedBlackTree::new();

    for &key in keys {
        assert_eq!(tree.insert(key), None);
        tree.assert_invariants();
    }

    tree
}

fn dot(tree: &RedBlackTree<u32>) -> String {
    let mut out = String::new();
    tree.dotgraph("test", &mut out).unwrap();
    out
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.find(key);
        assert_ne!(node, NIL, "item not found");
        assert_eq!(tree.key(node), key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `keys` (Heap's algorithm).
fn for_each_permutation(keys: &mut [u32], k: usize, f: &mut impl FnMut(&[u32])) {
    if k <= 1 {
        f(keys);
        return;
    }

    for i in 0..k - 1 {
        for_each_permutation(keys, k - 1, f);
        if k % 2 == 0 {
            keys.swap(i, k - 1);
        } else {
            keys.swap(0, k - 1);
        }
    }
    for_each_permutation(keys, k - 1, f);
}

#[test]
fn five_elems_find() {
    let mut keys = [0, 1, 2, 3, 4];
    let mut count = 0;

    for_each_permutation(&mut keys, 5, &mut |keys: &[u32]| {
        insert_find_all(keys);
        count += 1;
    });

    assert_eq!(count, 120);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        assert_eq!(tree.remove(key), Some(*key));
        assert!(!tree.contains(key));
        tree.assert_invariants();
    }
    assert!(tree.is_empty());

    for &key in keys {
        assert_eq!(tree.insert(key), None);
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert_eq!(tree.remove(key), Some(*key));
        tree.assert_invariants();
    }
    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    let mut keys = [0, 1, 2, 3];
    for_each_permutation(&mut keys, 4, &mut |keys: &[u32]| insert_remove_all(keys));
}

#[test]
fn remove_every_order_from_seven() {
    // Every removal order from the same tree, to drive each delete fixup case on both sides.
    let mut order = [0, 1, 2, 3, 4, 5, 6];

    for_each_permutation(&mut order, 7, &mut |order: &[u32]| {
        let mut tree = tree_of(&[3, 1, 5, 0, 2, 4, 6]);

        for (removed, key) in order.iter().enumerate() {
            assert_eq!(tree.remove(key), Some(*key));
            tree.assert_invariants();
            assert_eq!(tree.len(), order.len() - removed - 1);
        }
    });
}

#[test]
fn insert_and_contains() {
    let mut tree = RedBlackTree::new();
    assert!(!tree.contains(&5));

    tree.insert(5);
    assert!(tree.contains(&5));
    tree.insert(3);
    tree.insert(7);

    assert!(tree.contains(&5));
    assert!(tree.contains(&3));
    assert!(tree.contains(&7));
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [3, 5, 7]);
    tree.assert_invariants();
}

#[test]
fn remove_middle() {
    let mut tree = tree_of(&[10, 20, 30]);

    assert!(tree.contains(&20));
    assert_eq!(tree.remove(&20), Some(20));

    assert!(!tree.contains(&20));
    assert!(tree.contains(&10));
    assert!(tree.contains(&30));
    tree.assert_invariants();
}

#[test]
fn remove_evens_keeps_height_bound() {
    init_logging();

    let mut tree = RedBlackTree::new();
    for i in 0..100 {
        tree.insert(i);
    }
    for i in (0..100).step_by(2) {
        assert_eq!(tree.remove(&i), Some(i));
    }

    for i in 0..100 {
        assert_eq!(tree.contains(&i), i % 2 != 0, "key {i}");
    }

    let stats = tree.validate().unwrap();
    assert_eq!(stats.len(), 50);
    assert_eq!(stats.height(), tree.height());
    assert!((tree.height() as f64) <= 2.0 * 101f64.log2());
}

#[test]
fn ascending_inserts_stay_balanced() {
    init_logging();

    let mut tree = RedBlackTree::new();
    for i in 0..1024u32 {
        tree.insert(i);
    }

    let stats = tree.validate().unwrap();
    assert_eq!(stats.len(), 1024);
    assert!((stats.height() as f64) <= 2.0 * 1025f64.log2());
    // The longest path has at most one red node per black node, and the root is black.
    assert!(stats.height() <= 2 * (stats.black_height() + 1));
}

#[test]
fn duplicate_insert_is_rejected() {
    let mut tree = tree_of(&[4, 2, 6]);
    let before = dot(&tree);

    assert_eq!(tree.insert(2), Some(2));
    assert_eq!(tree.len(), 3);
    assert_eq!(dot(&tree), before);
    tree.assert_invariants();
}

#[test]
fn remove_absent_is_noop() {
    let mut tree = tree_of(&[8, 4, 12, 2, 6, 10, 14, 1]);
    let before = dot(&tree);

    assert_eq!(tree.remove(&5), None);
    assert_eq!(tree.remove(&100), None);

    assert_eq!(dot(&tree), before);
    assert_eq!(tree.len(), 8);
    tree.assert_invariants();

    let mut empty: RedBlackTree<u32> = RedBlackTree::new();
    assert_eq!(empty.remove(&0), None);
    assert!(empty.is_empty());
}

#[test]
fn freed_slots_are_reused() {
    let mut tree = tree_of(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(tree.nodes.len(), 11);

    for i in 0..10 {
        tree.remove(&i);
    }
    assert_eq!(tree.free.len(), 10);

    for i in 10..20 {
        tree.insert(i);
    }
    assert_eq!(tree.nodes.len(), 11);
    assert!(tree.free.is_empty());
    tree.assert_invariants();
}

#[test]
fn clear_frees_everything() {
    init_logging();

    let mut tree: RedBlackTree<u32> = (0..100).collect();
    tree.remove(&50);
    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.nodes.len(), 1);
    assert!(tree.free.is_empty());
    assert_eq!(tree.iter().next(), None);
    tree.assert_invariants();

    // The tree is still usable afterwards.
    tree.extend([3, 1, 2]);
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [1, 2, 3]);
    tree.assert_invariants();
}

#[test]
fn clear_drops_every_key() {
    use std::rc::Rc;

    let marker = Rc::new(());
    let mut tree = RedBlackTree::new();
    for i in 0..32u32 {
        tree.insert((i, Rc::clone(&marker)));
    }
    assert_eq!(Rc::strong_count(&marker), 33);

    tree.remove(&(7, Rc::clone(&marker)));
    assert_eq!(Rc::strong_count(&marker), 32);

    tree.clear();
    assert_eq!(Rc::strong_count(&marker), 1);

    for i in 0..8u32 {
        tree.insert((i, Rc::clone(&marker)));
    }
    drop(tree);
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn iter_is_exact_and_restartable() {
    let tree: RedBlackTree<u32> = [9, 3, 7, 1, 5].into_iter().collect();

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 5);
    assert_eq!(iter.next(), Some(&1));
    assert_eq!(iter.len(), 4);

    let rest = iter.clone().copied().collect::<Vec<_>>();
    assert_eq!(rest, [3, 5, 7, 9]);
    assert_eq!(iter.copied().collect::<Vec<_>>(), rest);

    let again = (&tree).into_iter().copied().collect::<Vec<_>>();
    assert_eq!(again, [1, 3, 5, 7, 9]);

    let mut done = tree.iter().skip(5);
    assert_eq!(done.next(), None);
    assert_eq!(done.next(), None);
}

#[test]
fn from_iter_rejects_duplicates() {
    let tree: RedBlackTree<u32> = [3, 1, 3, 2, 1].into_iter().collect();

    assert_eq!(tree.len(), 3);
    assert_eq!(format!("{tree:?}"), "{1, 2, 3}");
    tree.assert_invariants();
}

#[test]
fn borrowed_lookups() {
    let mut tree = RedBlackTree::new();
    tree.insert("pear".to_string());
    tree.insert("apple".to_string());
    tree.insert("fig".to_string());

    assert!(tree.contains("apple"));
    assert_eq!(tree.get("fig").map(String::as_str), Some("fig"));
    assert_eq!(tree.get("plum"), None);
    assert_eq!(tree.remove("pear").as_deref(), Some("pear"));
    assert!(!tree.contains("pear"));
    tree.assert_invariants();
}

#[test]
fn clone_is_independent() {
    let original = tree_of(&[1, 2, 3, 4]);
    let mut copy = original.clone();

    copy.remove(&2);
    copy.insert(9);

    assert_eq!(original.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert_eq!(copy.iter().copied().collect::<Vec<_>>(), [1, 3, 4, 9]);
    original.assert_invariants();
    copy.assert_invariants();
}

#[test]
fn dotgraph_colors_nodes() {
    assert_eq!(
        dot(&RedBlackTree::new()),
        "digraph \"graph-test\" {}"
    );

    // 2 is the black root with two red children.
    let out = dot(&tree_of(&[1, 2, 3]));
    assert!(out.contains("\"graphtest-2\" [label=\"2\", style=filled, fillcolor=black"));
    assert!(out.contains("\"graphtest-1\" [label=\"1\", style=filled, fillcolor=red"));
    assert!(out.contains("\"graphtest-3\" [label=\"3\", style=filled, fillcolor=red"));
    assert!(out.contains("\"graphtest-2\" -> \"graphtest-1\";"));
    assert!(out.contains("\"graphtest-2\" -> \"graphtest-3\";"));
    assert_eq!(out.matches("[shape=point]").count(), 4);
}

#[test]
fn validate_reports_red_root() {
    let mut tree = tree_of(&[1, 2, 3]);
    let root = tree.root;

    tree.set_color(root, Color::Red);
    assert_eq!(tree.validate(), Err(InvariantError::RedRoot));
}

#[test]
fn validate_reports_black_height_of_root() {
    let empty: RedBlackTree<u32> = RedBlackTree::new();
    assert_eq!(empty.validate().unwrap().black_height(), 0);

    // A lone black root and a root with two red children both have black-height 0.
    assert_eq!(tree_of(&[1]).validate().unwrap().black_height(), 0);
    assert_eq!(tree_of(&[1, 2, 3]).validate().unwrap().black_height(), 0);

    // Inserting 4 recolors 1 and 3 black.
    let stats = tree_of(&[2, 1, 3, 4]).validate().unwrap();
    assert_eq!(stats.black_height(), 1);
    assert_eq!(stats.height(), 3);
}

#[test]
fn validate_reports_sentinel_has_key() {
    let mut tree = tree_of(&[1, 2]);

    tree.nodes[NIL.0].key = Some(7);
    assert_eq!(tree.validate(), Err(InvariantError::SentinelHasKey));

    tree.nodes[NIL.0].key = None;
    tree.assert_invariants();
}

#[test]
fn validate_reports_root_has_parent() {
    let mut tree = tree_of(&[1, 2, 3]);
    let root = tree.root;
    let one = tree.find(&1);

    tree.set_parent(root, one);
    assert_eq!(tree.validate(), Err(InvariantError::RootHasParent));

    tree.set_parent(root, NIL);
    tree.assert_invariants();
}

#[test]
fn validate_reports_red_sentinel() {
    let mut tree = tree_of(&[1]);

    tree.nodes[NIL.0].links.color = Color::Red;
    assert_eq!(tree.validate(), Err(InvariantError::RedSentinel));
    tree.nodes[NIL.0].links.color = Color::Black;
}

#[test]
fn validate_reports_consecutive_reds() {
    // 2 is black with black children 1 and 3; 4 is the red right child of 3.
    let mut tree = tree_of(&[2, 1, 3, 4]);
    let three = tree.find(&3);

    tree.set_color(three, Color::Red);
    assert_eq!(
        tree.validate(),
        Err(InvariantError::ConsecutiveReds { key: 3 })
    );
}

#[test]
fn validate_reports_unbalanced_blacks() {
    let mut tree = tree_of(&[1, 2, 3]);
    let one = tree.find(&1);

    tree.set_color(one, Color::Black);
    assert_eq!(
        tree.validate(),
        Err(InvariantError::UnbalancedBlacks {
            key: 2,
            left: 1,
            right: 0
        })
    );
}

#[test]
fn validate_reports_broken_parent_link() {
    let mut tree = tree_of(&[1, 2, 3]);
    let (one, three) = (tree.find(&1), tree.find(&3));

    tree.set_parent(one, three);
    assert_eq!(
        tree.validate(),
        Err(InvariantError::BrokenParentLink { key: 2 })
    );

    let two = tree.root;
    tree.set_parent(one, two);
    tree.assert_invariants();
}

#[test]
fn validate_reports_out_of_order() {
    let mut tree = tree_of(&[1, 2, 3]);
    let (one, three) = (tree.find(&1), tree.find(&3));

    let low = tree.nodes[one.0].key.take();
    let high = tree.nodes[three.0].key.take();
    tree.nodes[one.0].key = high;
    tree.nodes[three.0].key = low;

    assert_eq!(
        tree.validate(),
        Err(InvariantError::OutOfOrder { prev: 3, next: 2 })
    );
}

#[test]
fn validate_reports_length_mismatch() {
    let mut tree = tree_of(&[1, 2, 3]);

    tree.len += 1;
    assert_eq!(
        tree.validate(),
        Err(InvariantError::LengthMismatch {
            expected: 4,
            found: 3
        })
    );
    tree.len -= 1;
}

#[test]
fn invariant_errors_display() {
    let error: InvariantError<u32> = InvariantError::UnbalancedBlacks {
        key: 7,
        left: 2,
        right: 1,
    };
    assert_eq!(error.to_string(), "subtrees of 7 have black-heights 2 and 1");
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        init_logging();
        model::run_btree_equivalence(ops);
    }
}
