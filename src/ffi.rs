//! C ABI for the foreign-function bindings.
//!
//! Each handle is a `#[repr(C)]` struct whose scalar fields callers read
//! directly. The trailing pointer owns the Rust container; every mutating
//! export refreshes the scalars from it before returning.
//!
//! Misses are never faults: booleans answer `false`, `Dict_Get` answers
//! [`DICT_MISSING`]. A null handle is treated as an empty container.

#![allow(non_snake_case)]

use crate::btree::BTree;
use crate::config::BTreeConfig;
use crate::dict::{Dict, Key as DictKey, Value as DictValue};
use std::io::{self, Write};
use std::os::raw::c_int;
use std::ptr;
use tracing::warn;

/// Value `Dict_Get` returns for an absent key.
pub const DICT_MISSING: DictValue = i64::MIN;

#[repr(C)]
#[derive(Debug)]
pub struct BTreeHandle {
    pub degree: usize,
    pub length: usize,
    pub num_nodes: usize,
    pub node_bytes: usize,
    pub root: *mut BTree,
}

impl BTreeHandle {
    fn boxed(tree: BTree) -> *mut BTreeHandle {
        let mut handle = Box::new(BTreeHandle {
            degree: 0,
            length: 0,
            num_nodes: 0,
            node_bytes: 0,
            root: Box::into_raw(Box::new(tree)),
        });
        handle.sync();
        Box::into_raw(handle)
    }

    fn tree(&self) -> Option<&BTree> {
        // SAFETY: `root` is either null or the box created in `boxed`,
        // released only by `btreeFree`.
        unsafe { self.root.as_ref() }
    }

    fn tree_mut(&mut self) -> Option<&mut BTree> {
        // SAFETY: as in `tree`; `&mut self` makes the access exclusive.
        unsafe { self.root.as_mut() }
    }

    fn sync(&mut self) {
        let Some(tree) = self.tree() else { return };
        let (degree, length, num_nodes, node_bytes) =
            (tree.degree(), tree.len(), tree.num_nodes(), tree.node_bytes());
        self.degree = degree;
        self.length = length;
        self.num_nodes = num_nodes;
        self.node_bytes = node_bytes;
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct DictHandle {
    pub used: u32,
    pub dk_size: usize,
    pub keys: *mut Dict,
}

impl DictHandle {
    fn boxed(dict: Dict) -> *mut DictHandle {
        let mut handle = Box::new(DictHandle {
            used: 0,
            dk_size: 0,
            keys: Box::into_raw(Box::new(dict)),
        });
        handle.sync();
        Box::into_raw(handle)
    }

    fn dict(&self) -> Option<&Dict> {
        // SAFETY: `keys` is either null or the box created in `boxed`,
        // released only by `Dict_Free`.
        unsafe { self.keys.as_ref() }
    }

    fn dict_mut(&mut self) -> Option<&mut Dict> {
        // SAFETY: as in `dict`; `&mut self` makes the access exclusive.
        unsafe { self.keys.as_mut() }
    }

    fn sync(&mut self) {
        let Some(dict) = self.dict() else { return };
        let (used, dk_size) = (dict.len(), dict.capacity());
        self.used = u32::try_from(used).unwrap_or(u32::MAX);
        self.dk_size = dk_size;
    }
}

/// Creates a tree with the default degree. Null on allocation failure.
#[no_mangle]
pub extern "C" fn btreeNew() -> *mut BTreeHandle {
    btreeNewWithDegree(BTreeConfig::default().degree)
}

/// Creates a tree with `degree`. Null if `degree` is outside
/// `2..=usize::MAX / 2` or allocation fails.
#[no_mangle]
pub extern "C" fn btreeNewWithDegree(degree: usize) -> *mut BTreeHandle {
    match BTree::new(degree) {
        Ok(tree) => BTreeHandle::boxed(tree),
        Err(err) => {
            warn!(degree, %err, "btreeNew failed");
            ptr::null_mut()
        }
    }
}

/// Inserts `key`; `false` if it was present or a split could not allocate.
///
/// # Safety
/// `handle` must be null or a live pointer from `btreeNew*`, not used
/// concurrently.
#[no_mangle]
pub unsafe extern "C" fn btreeSet(handle: *mut BTreeHandle, key: c_int) -> bool {
    let Some(handle) = handle.as_mut() else {
        return false;
    };
    let Some(tree) = handle.tree_mut() else {
        return false;
    };
    let inserted = match tree.insert(key) {
        Ok(inserted) => inserted,
        Err(err) => {
            warn!(key, %err, "btreeSet failed");
            false
        }
    };
    handle.sync();
    inserted
}

/// Removes `key`; `false` if it was absent.
///
/// # Safety
/// Same contract as [`btreeSet`].
#[no_mangle]
pub unsafe extern "C" fn btreeDel(handle: *mut BTreeHandle, key: c_int) -> bool {
    let Some(handle) = handle.as_mut() else {
        return false;
    };
    let removed = handle
        .tree_mut()
        .is_some_and(|tree| tree.remove(key));
    handle.sync();
    removed
}

/// # Safety
/// Same contract as [`btreeSet`].
#[no_mangle]
pub unsafe extern "C" fn btreeHas(handle: *const BTreeHandle, key: c_int) -> bool {
    handle
        .as_ref()
        .and_then(BTreeHandle::tree)
        .is_some_and(|tree| tree.contains(key))
}

/// Writes the keys in order to stderr. Write errors are ignored.
///
/// # Safety
/// Same contract as [`btreeSet`].
#[no_mangle]
pub unsafe extern "C" fn btreePrint(handle: *const BTreeHandle) {
    let Some(tree) = handle.as_ref().and_then(BTreeHandle::tree) else {
        return;
    };
    let mut err = io::stderr().lock();
    let _ = tree.print(&mut err);
    let _ = err.flush();
}

/// Releases the handle and every node of its tree.
///
/// # Safety
/// `handle` must be null or a live pointer from `btreeNew*`; it is
/// dangling afterwards.
#[no_mangle]
pub unsafe extern "C" fn btreeFree(handle: *mut BTreeHandle) {
    if handle.is_null() {
        return;
    }
    let handle = Box::from_raw(handle);
    if !handle.root.is_null() {
        drop(Box::from_raw(handle.root));
    }
}

#[no_mangle]
pub extern "C" fn Dict_New() -> *mut DictHandle {
    DictHandle::boxed(Dict::new())
}

/// Creates a dict that holds `size` entries without resizing. Null if the
/// slot array cannot be allocated.
#[no_mangle]
pub extern "C" fn Dict_NewPresized(size: usize) -> *mut DictHandle {
    match Dict::presized(size) {
        Ok(dict) => DictHandle::boxed(dict),
        Err(err) => {
            warn!(size, %err, "Dict_NewPresized failed");
            ptr::null_mut()
        }
    }
}

/// Inserts or overwrites. A failed resize leaves the dict unchanged.
///
/// # Safety
/// `handle` must be null or a live pointer from `Dict_New*`, not used
/// concurrently.
#[no_mangle]
pub unsafe extern "C" fn Dict_Set(handle: *mut DictHandle, key: DictKey, value: DictValue) {
    let Some(handle) = handle.as_mut() else {
        return;
    };
    if let Some(dict) = handle.dict_mut() {
        if let Err(err) = dict.insert(key, value) {
            warn!(key, %err, "Dict_Set failed");
        }
    }
    handle.sync();
}

/// Value for `key`, or [`DICT_MISSING`].
///
/// # Safety
/// Same contract as [`Dict_Set`].
#[no_mangle]
pub unsafe extern "C" fn Dict_Get(handle: *const DictHandle, key: DictKey) -> DictValue {
    handle
        .as_ref()
        .and_then(DictHandle::dict)
        .and_then(|dict| dict.get(key))
        .unwrap_or(DICT_MISSING)
}

/// # Safety
/// Same contract as [`Dict_Set`].
#[no_mangle]
pub unsafe extern "C" fn Dict_Has(handle: *const DictHandle, key: DictKey) -> bool {
    handle
        .as_ref()
        .and_then(DictHandle::dict)
        .is_some_and(|dict| dict.contains_key(key))
}

/// Removes `key`; `false` if it was absent.
///
/// # Safety
/// Same contract as [`Dict_Set`].
#[no_mangle]
pub unsafe extern "C" fn Dict_Del(handle: *mut DictHandle, key: DictKey) -> bool {
    let Some(handle) = handle.as_mut() else {
        return false;
    };
    let removed = handle
        .dict_mut()
        .is_some_and(|dict| dict.remove(key).is_some());
    handle.sync();
    removed
}

/// # Safety
/// Same contract as [`Dict_Set`].
#[no_mangle]
pub unsafe extern "C" fn Dict_Len(handle: *const DictHandle) -> u32 {
    handle.as_ref().map_or(0, |handle| handle.used)
}

/// Releases the handle and its slot array.
///
/// # Safety
/// `handle` must be null or a live pointer from `Dict_New*`; it is
/// dangling afterwards.
#[no_mangle]
pub unsafe extern "C" fn Dict_Free(handle: *mut DictHandle) {
    if handle.is_null() {
        return;
    }
    let handle = Box::from_raw(handle);
    if !handle.keys.is_null() {
        drop(Box::from_raw(handle.keys));
    }
}
