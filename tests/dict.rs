// Dict integration tests through the public API.
//
// Invariants exercised:
// - Read-your-write: `get` right after `insert` returns the inserted value.
// - Load factor: `len <= usable` after every insertion.
// - Growth keeps the full set of pairs, with no loss or duplication.
// - Deletion tombstones a slot without breaking other keys' probe chains.
use int_collections::{Dict, DictConfig, Error};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Test: keys 0..1000 with random values into a default and a presized dict.
// Verifies: len is 1000 and get(10) returns the last value set for 10.
#[test]
fn thousand_random_values() {
    init_tracing();
    for mut d in [Dict::new(), Dict::presized(1000).unwrap()] {
        let mut last_for_ten = None;
        for (k, x) in (0..1000).zip(lcg(7)) {
            let v = (x >> 40) as i64 % 10_001;
            d.insert(k, v).unwrap();
            if k == 10 {
                last_for_ten = Some(v);
            }
        }
        assert_eq!(d.len(), 1000);
        assert_eq!(d.get(10), last_for_ten);
    }
}

// Test: overwrite the same key repeatedly.
// Verifies: len stays 1 and the newest value wins.
#[test]
fn overwrite_keeps_single_entry() {
    let mut d = Dict::new();
    for v in 0..100 {
        d.insert(5, v).unwrap();
        assert_eq!(d.get(5), Some(v));
    }
    assert_eq!(d.len(), 1);
}

// Test: growth across many resizes with a sparse key pattern.
// Verifies: contents equal a HashMap model and the load bound holds.
#[test]
fn growth_preserves_pairs() {
    init_tracing();
    let mut d = Dict::new();
    let mut model = HashMap::new();
    for x in lcg(99).take(20_000) {
        let k = x as i64;
        let v = (x >> 7) as i64;
        assert_eq!(d.insert(k, v).unwrap(), model.insert(k, v));
        assert!(d.len() <= d.usable());
    }
    assert_eq!(d.len(), model.len());
    let mut pairs: Vec<_> = d.iter().collect();
    pairs.sort_unstable();
    let mut expected: Vec<_> = model.into_iter().collect();
    expected.sort_unstable();
    assert_eq!(pairs, expected);
}

// Test: delete a prefix of keys, then look up the rest.
// Verifies: surviving keys resolve through the tombstones.
#[test]
fn deletes_do_not_hide_survivors() {
    let mut d = Dict::new();
    for k in 0..70 {
        d.insert(k, k).unwrap();
    }
    for k in 0..30 {
        assert!(d.contains_key(k));
        assert_eq!(d.remove(k), Some(k));
    }
    assert_eq!(d.len(), 40);
    for k in 30..70 {
        assert_eq!(d.get(k), Some(k));
    }
    for k in 0..30 {
        assert_eq!(d.get(k), None);
    }
}

// Test: a custom config with a lower load factor.
// Verifies: the config is honoured and invalid configs are rejected.
#[test]
fn custom_config() {
    let config = DictConfig {
        load_numerator: 1,
        load_denominator: 2,
        ..DictConfig::default()
    };
    let mut d = Dict::with_config(config, 0).unwrap();
    assert_eq!(d.usable(), 4);
    for k in 0..100 {
        d.insert(k, k).unwrap();
        assert!(d.len() * 2 <= d.capacity());
    }

    let broken = DictConfig {
        small_growth: 0,
        ..DictConfig::default()
    };
    assert!(matches!(
        Dict::with_config(broken, 0),
        Err(Error::InvalidConfig(_))
    ));
}
