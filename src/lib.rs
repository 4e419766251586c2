//! int-collections: an order-B tree and an open-addressed hash dict over
//! integer keys, with the C ABI the foreign-function bindings load.
//!
//! Internal Design:
//!
//! Summary
//! - Two independent containers, no shared state:
//!   - `BTree`: balanced order-`b` tree of `i32` keys. Nodes hold
//!     `b-1..=2b-1` sorted keys (the root may hold fewer) and live in a
//!     `SlotMap` arena addressed by generational `NodeId`s.
//!   - `Dict`: `i64 -> i64` open-addressed table with tagged slots
//!     (empty / active / tombstone), cached hashes and perturbed probing.
//! - `ffi` wraps both in `#[repr(C)]` handles whose scalar fields mirror
//!   the container after every call.
//!
//! Constraints
//! - Single-threaded: mutation takes `&mut self`; callers sharing a
//!   container across threads wrap it in their own lock.
//! - Every operation finishes in bounded time: `O(log_b n)` for the tree,
//!   amortized `O(1)` for the dict.
//! - A failed operation leaves the key set unchanged.
//!
//! BTree policy
//! - Insertion splits any full node before descending into it, so the
//!   median always has room in the parent. A full root grows a new root.
//! - Deletion makes sure every child it enters holds at least `b` keys:
//!   rotate a key in from the left sibling, else the right, else merge
//!   with the left sibling, else the right. A root left without keys hands
//!   over to its only child.
//!
//! Dict policy
//! - Load factor 2/3, counted over active entries plus tombstones.
//! - Growth target is `used * 4` (small tables) or `used * 2` (past
//!   50 000 entries); the new size is the next power of two above it.
//! - Rebuilding copies active slots into a fresh array by cached hash and
//!   drops tombstones; the old array is released only after the new one
//!   is complete.
//!
//! Errors
//! - Misses are `bool`/`Option`, never errors. `Error` covers a degree
//!   below 2 or above `usize::MAX / 2`, an invalid dict config, and
//!   allocation failure.

pub mod btree;
mod btree_proptest;
pub mod config;
pub mod dict;
mod dict_proptest;
pub mod error;
pub mod ffi;

// Public surface
pub use btree::BTree;
pub use config::{BTreeConfig, DictConfig};
pub use dict::Dict;
pub use error::{Error, Result};
