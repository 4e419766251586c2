//! Dict: open-addressed `i64 -> i64` table.
//!
//! Every slot carries its key, value, cached hash and a tag. Probing starts
//! at `hash & mask` and follows the perturbed recurrence
//! `i = 5i + perturb + 1`, with `perturb` drained by `PERTURB_SHIFT` bits a
//! step; once `perturb` hits zero the recurrence cycles through every slot,
//! so a probe always reaches an empty slot.
//!
//! Deleted slots become tombstones and stay that way until the next
//! rebuild. The rebuild trigger counts them (`fill`), which keeps at least
//! one empty slot on every chain.

use crate::config::DictConfig;
use crate::error::Result;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};
use std::mem;
use tracing::debug;

pub type Key = i64;
pub type Value = i64;

const PERTURB_SHIFT: u32 = 5;

/// Hashes an integer key to itself. The perturbed probe spreads the high
/// bits, so sequential keys land in sequential slots without clustering.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }

    fn write_i64(&mut self, n: i64) {
        self.0 = n as u64;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

pub type IdentityState = BuildHasherDefault<IdentityHasher>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Empty,
    Active,
    Tombstone,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    key: Key,
    value: Value,
    hash: u64,
    tag: Tag,
}

impl Slot {
    const EMPTY: Slot = Slot {
        key: 0,
        value: 0,
        hash: 0,
        tag: Tag::Empty,
    };
}

struct Probe {
    mask: usize,
    index: usize,
    perturb: u64,
}

impl Probe {
    fn new(hash: u64, capacity: usize) -> Self {
        let mask = capacity - 1;
        Self {
            mask,
            index: hash as usize & mask,
            perturb: hash,
        }
    }

    fn index(&self) -> usize {
        self.index
    }

    fn advance(&mut self) {
        self.perturb >>= PERTURB_SHIFT;
        self.index = self
            .index
            .wrapping_mul(5)
            .wrapping_add(self.perturb as usize)
            .wrapping_add(1)
            & self.mask;
    }
}

enum Lookup {
    Occupied(usize),
    /// Where a new entry would go: the first tombstone passed, else the
    /// empty slot that ended the probe.
    Vacant {
        index: usize,
        reuses_tombstone: bool,
    },
}

pub struct Dict<S = IdentityState> {
    hasher: S,
    config: DictConfig,
    slots: Vec<Slot>,
    // active entries
    used: usize,
    // active entries plus tombstones
    fill: usize,
}

impl Dict {
    pub fn new() -> Self {
        Self::with_hasher(IdentityState::default())
    }

    /// Dict that takes `entries` insertions without resizing.
    pub fn presized(entries: usize) -> Result<Self> {
        Self::with_config(DictConfig::default(), entries)
    }

    pub fn with_config(config: DictConfig, entries: usize) -> Result<Self> {
        Self::with_config_and_hasher(config, entries, IdentityState::default())
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher> Dict<S> {
    pub fn with_hasher(hasher: S) -> Self {
        let config = DictConfig::default();
        Self {
            hasher,
            slots: vec![Slot::EMPTY; config.min_capacity],
            config,
            used: 0,
            fill: 0,
        }
    }

    pub fn with_config_and_hasher(config: DictConfig, entries: usize, hasher: S) -> Result<Self> {
        config.validate()?;
        let slots = empty_slots(config.capacity_for(entries)?)?;
        Ok(Self {
            hasher,
            config,
            slots,
            used: 0,
            fill: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Slot count; always a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries (tombstones included) the current slot array admits.
    pub fn usable(&self) -> usize {
        self.config.usable(self.slots.len())
    }

    pub fn tombstones(&self) -> usize {
        self.fill - self.used
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        match self.lookup(key, self.make_hash(key)) {
            Lookup::Occupied(index) => Some(self.slots[index].value),
            Lookup::Vacant { .. } => None,
        }
    }

    pub fn contains_key(&self, key: Key) -> bool {
        matches!(self.lookup(key, self.make_hash(key)), Lookup::Occupied(_))
    }

    /// Inserts or overwrites; returns the replaced value.
    ///
    /// A new key that would push the table past its load factor first
    /// rebuilds the slot array. If that allocation fails the dict is left
    /// exactly as it was.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<Option<Value>> {
        let hash = self.make_hash(key);
        match self.lookup(key, hash) {
            Lookup::Occupied(index) => Ok(Some(mem::replace(&mut self.slots[index].value, value))),
            Lookup::Vacant {
                index,
                reuses_tombstone: true,
            } => {
                self.occupy(index, key, value, hash);
                Ok(None)
            }
            Lookup::Vacant { index, .. } => {
                let index = if self.fill + 1 > self.usable() {
                    self.resize(self.config.grown_capacity(self.used)?)?;
                    find_empty(&self.slots, hash)
                } else {
                    index
                };
                self.occupy(index, key, value, hash);
                self.fill += 1;
                Ok(None)
            }
        }
    }

    /// Removes `key`, leaving a tombstone in its slot.
    pub fn remove(&mut self, key: Key) -> Option<Value> {
        let Lookup::Occupied(index) = self.lookup(key, self.make_hash(key)) else {
            return None;
        };
        let slot = &mut self.slots[index];
        slot.tag = Tag::Tombstone;
        self.used -= 1;
        Some(slot.value)
    }

    /// Entries in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.used,
        }
    }

    fn make_hash(&self, key: Key) -> u64 {
        self.hasher.hash_one(key)
    }

    fn lookup(&self, key: Key, hash: u64) -> Lookup {
        let mut tombstone = None;
        let mut probe = Probe::new(hash, self.slots.len());
        loop {
            let index = probe.index();
            let slot = &self.slots[index];
            match slot.tag {
                Tag::Empty => {
                    return Lookup::Vacant {
                        index: tombstone.unwrap_or(index),
                        reuses_tombstone: tombstone.is_some(),
                    }
                }
                Tag::Tombstone => {
                    tombstone.get_or_insert(index);
                }
                Tag::Active if slot.hash == hash && slot.key == key => {
                    return Lookup::Occupied(index)
                }
                Tag::Active => {}
            }
            probe.advance();
        }
    }

    fn occupy(&mut self, index: usize, key: Key, value: Value, hash: u64) {
        self.slots[index] = Slot {
            key,
            value,
            hash,
            tag: Tag::Active,
        };
        self.used += 1;
    }

    fn resize(&mut self, capacity: usize) -> Result<()> {
        let slots = rehash(&self.slots, capacity)?;
        debug!(
            old_capacity = self.slots.len(),
            new_capacity = capacity,
            used = self.used,
            dropped_tombstones = self.fill - self.used,
            "dict resize"
        );
        self.slots = slots;
        self.fill = self.used;
        Ok(())
    }
}

impl<S> fmt::Debug for Dict<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dict")
            .field("used", &self.used)
            .field("dk_size", &self.slots.len())
            .field("fill", &self.fill)
            .finish()
    }
}

impl<'a, S: BuildHasher> IntoIterator for &'a Dict<S> {
    type Item = (Key, Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

fn empty_slots(capacity: usize) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity)?;
    slots.resize(capacity, Slot::EMPTY);
    Ok(slots)
}

/// Builds a fresh slot array of `capacity` holding every active entry of
/// `old`, placed by its cached hash. Tombstones are dropped.
fn rehash(old: &[Slot], capacity: usize) -> Result<Vec<Slot>> {
    let mut slots = empty_slots(capacity)?;
    for slot in old.iter().filter(|s| s.tag == Tag::Active) {
        let index = find_empty(&slots, slot.hash);
        slots[index] = *slot;
    }
    Ok(slots)
}

/// First empty slot on `hash`'s chain. Tombstones are skipped, so only
/// use this where the key is known to be absent.
fn find_empty(slots: &[Slot], hash: u64) -> usize {
    let mut probe = Probe::new(hash, slots.len());
    while slots[probe.index()].tag != Tag::Empty {
        probe.advance();
    }
    probe.index()
}

/// Iterator over `(key, value)` pairs of a `Dict`.
pub struct Iter<'a> {
    slots: std::slice::Iter<'a, Slot>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = (Key, Value);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.find(|s| s.tag == Tag::Active)?;
        self.remaining -= 1;
        Some((slot.key, slot.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
