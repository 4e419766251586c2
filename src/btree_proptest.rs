#![cfg(test)]

// Property tests for BTree kept inside the crate so they can call the
// structural checker.

use crate::btree::{BTree, Key};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Clone, Debug)]
enum Op {
    Insert(Key),
    Remove(Key),
    Contains(Key),
    Iterate,
}

// A narrow key range makes duplicates and hits on removal common.
fn arb_op() -> impl Strategy<Value = Op> {
    let key = -64i32..64;
    prop_oneof![
        4 => key.clone().prop_map(Op::Insert),
        3 => key.clone().prop_map(Op::Remove),
        1 => key.prop_map(Op::Contains),
        1 => Just(Op::Iterate),
    ]
}

/// `levels <= ceil(log_b(n + 1))`, checked as `b^(levels-1) < n + 1`.
fn height_within_bound(tree: &BTree) -> bool {
    let levels = tree.height();
    if levels == 0 {
        return tree.is_empty();
    }
    let b = tree.degree() as u128;
    b.pow(levels as u32 - 1) < tree.len() as u128 + 1
}

// Property: State-machine equivalence against std::collections::BTreeSet.
// Invariants exercised across random operation sequences:
// - `insert` answers true exactly for absent keys; duplicates change nothing.
// - `remove` answers true exactly for present keys; `len` drops by one.
// - In-order iteration equals the model's ascending key list.
// - Node fill, separator order and equal leaf depth hold after every op.
// - Height stays within the logarithmic bound for the current size.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(degree in 2usize..6, ops in proptest::collection::vec(arb_op(), 1..300)) {
        let mut sut = BTree::new(degree).unwrap();
        let mut model: BTreeSet<Key> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(k) => {
                    let fresh = !model.contains(&k);
                    prop_assert_eq!(sut.insert(k).unwrap(), fresh);
                    model.insert(k);
                }
                Op::Remove(k) => {
                    let before = sut.len();
                    let present = model.remove(&k);
                    prop_assert_eq!(sut.remove(k), present);
                    prop_assert!(!sut.contains(k));
                    if present {
                        prop_assert_eq!(sut.len(), before - 1);
                    } else {
                        prop_assert_eq!(sut.len(), before);
                    }
                }
                Op::Contains(k) => {
                    prop_assert_eq!(sut.contains(k), model.contains(&k));
                }
                Op::Iterate => {
                    let keys: Vec<Key> = sut.iter().collect();
                    let expected: Vec<Key> = model.iter().copied().collect();
                    prop_assert_eq!(keys, expected);
                }
            }

            if let Err(broken) = sut.check_invariants() {
                prop_assert!(false, "invariant broken: {}", broken);
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.first(), model.first().copied());
            prop_assert_eq!(sut.last(), model.last().copied());
            prop_assert!(height_within_bound(&sut), "height {} for {} keys", sut.height(), sut.len());
        }
    }
}

// Property: Inserting a batch and deleting it in a different order empties
// the tree back to a single leaf, whatever the degree.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_fill_then_drain(
        degree in 2usize..8,
        keys in proptest::collection::hash_set(any::<i32>(), 0..400),
        seed in any::<u64>(),
    ) {
        let mut sut = BTree::new(degree).unwrap();
        let mut order: Vec<Key> = keys.into_iter().collect();
        for &k in &order {
            prop_assert!(sut.insert(k).unwrap());
        }
        prop_assert_eq!(sut.len(), order.len());
        prop_assert!(height_within_bound(&sut));

        order.sort_by_key(|k| (*k as u64).wrapping_mul(seed | 1));
        for &k in &order {
            prop_assert!(sut.remove(k));
        }
        prop_assert!(sut.is_empty());
        prop_assert_eq!(sut.num_nodes(), 1);
        if let Err(broken) = sut.check_invariants() {
            prop_assert!(false, "invariant broken: {}", broken);
        }
    }
}
