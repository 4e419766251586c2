#![cfg(test)]

// Property tests for Dict kept inside the crate so the constant-hasher
// variant can live next to the default one.

use crate::dict::{Dict, Key, Value};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hasher};

#[derive(Clone, Debug)]
enum Op {
    Insert(Key, Value),
    Remove(Key),
    Get(Key),
    Iterate,
}

// Pool-indexed keys keep collisions between ops frequent while still
// covering negative and large values.
fn arb_scenario() -> impl Strategy<Value = (Vec<Key>, Vec<Op>)> {
    proptest::collection::vec(any::<i64>(), 1..=24).prop_flat_map(|pool| {
        let key = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (key.clone(), any::<i64>()).prop_map(|(k, v)| Op::Insert(k, v)),
            2 => key.clone().prop_map(Op::Remove),
            2 => prop_oneof![key, any::<i64>()].prop_map(Op::Get),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<S: BuildHasher>(mut sut: Dict<S>, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, Value> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(k, v) => {
                let prev = sut.insert(k, v).unwrap();
                prop_assert_eq!(prev, model.insert(k, v));
                prop_assert_eq!(sut.get(k), Some(v), "get right after insert");
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(k), model.remove(&k));
                prop_assert!(!sut.contains_key(k));
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(k), model.get(&k).copied());
            }
            Op::Iterate => {
                let seen: BTreeMap<Key, Value> = sut.iter().collect();
                let expected: BTreeMap<Key, Value> = model.iter().map(|(&k, &v)| (k, v)).collect();
                prop_assert_eq!(sut.iter().count(), model.len(), "no duplicated entries");
                prop_assert_eq!(seen, expected);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity().is_power_of_two());
        prop_assert!(sut.len() + sut.tombstones() <= sut.usable());
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `insert` returns the replaced value; `get` right after returns the new one.
// - `remove` returns the stored value once, then the key is absent.
// - Iteration yields every live pair exactly once, across resizes.
// - Load factor bound and power-of-two capacity hold after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((_pool, ops) in arb_scenario()) {
        run(Dict::new(), ops)?;
    }
}

#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher). Every key shares one probe chain,
// which stresses tombstone skipping and reuse.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((_pool, ops) in arb_scenario()) {
        run(Dict::with_hasher(ConstBuildHasher), ops)?;
    }
}

// Property: A presized dict never resizes while it holds at most the
// requested number of entries.
proptest! {
    #[test]
    fn prop_presized_holds_request(n in 0usize..3000) {
        let mut sut = Dict::presized(n).unwrap();
        let capacity = sut.capacity();
        for k in 0..n as i64 {
            sut.insert(k, k).unwrap();
        }
        prop_assert_eq!(sut.capacity(), capacity);
        prop_assert_eq!(sut.len(), n);
    }
}
