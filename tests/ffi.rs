// C ABI tests: drive the exported functions the way the bindings do and
// read the handle fields directly.
use int_collections::ffi::*;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Test: degree-3 tree, set 12, delete absent 1, delete 12.
// Verifies: true / false / true and the mirrored fields after each call.
#[test]
fn btree_scenario() {
    unsafe {
        let t = btreeNewWithDegree(3);
        assert!(!t.is_null());
        assert_eq!((*t).degree, 3);
        assert_eq!((*t).length, 0);
        assert_eq!((*t).num_nodes, 1);
        assert!((*t).node_bytes > 0);

        assert!(btreeSet(t, 12));
        assert_eq!((*t).length, 1);
        btreePrint(t);

        assert!(!btreeDel(t, 1));
        assert_eq!((*t).length, 1);
        assert!(btreeDel(t, 12));
        assert_eq!((*t).length, 0);
        assert!(!btreeHas(t, 12));

        btreeFree(t);
    }
}

// Test: default constructor and node accounting through the handle.
#[test]
fn btree_default_handle_tracks_nodes() {
    unsafe {
        let t = btreeNew();
        assert!(!t.is_null());
        assert_eq!((*t).degree, 200);
        for k in 0..2_000 {
            assert!(btreeSet(t, k));
        }
        assert!(!btreeSet(t, 1_000));
        assert_eq!((*t).length, 2_000);
        assert!((*t).num_nodes > 1);
        assert!(btreeHas(t, 1_999));
        btreeFree(t);
    }
}

// Test: 1000 keys with random values through Dict_Set.
// Verifies: Dict_Len is 1000 and Dict_Get(10) is the last value set.
#[test]
fn dict_scenario() {
    unsafe {
        for d in [Dict_New(), Dict_NewPresized(1000)] {
            assert!(!d.is_null());
            let mut last_for_ten = DICT_MISSING;
            for (k, x) in (0..1000).zip(lcg(3)) {
                let v = (x >> 40) as i64 % 10_001;
                Dict_Set(d, k, v);
                if k == 10 {
                    last_for_ten = v;
                }
            }
            assert_eq!(Dict_Len(d), 1000);
            assert_eq!((*d).used, 1000);
            assert!((*d).dk_size.is_power_of_two());
            assert_eq!(Dict_Get(d, 10), last_for_ten);
            Dict_Free(d);
        }
    }
}

// Test: presized handle keeps its size; delete and miss paths.
#[test]
fn dict_presized_delete_and_miss() {
    unsafe {
        let d = Dict_NewPresized(100);
        let size = (*d).dk_size;
        for k in 0..100 {
            Dict_Set(d, k, k * 2);
        }
        assert_eq!((*d).dk_size, size);

        assert!(Dict_Has(d, 42));
        assert!(Dict_Del(d, 42));
        assert!(!Dict_Del(d, 42));
        assert!(!Dict_Has(d, 42));
        assert_eq!(Dict_Get(d, 42), DICT_MISSING);
        assert_eq!(Dict_Len(d), 99);
        assert_eq!(Dict_Get(d, 43), 86);
        Dict_Free(d);
    }
}
