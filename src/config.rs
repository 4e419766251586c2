//! Construction settings for `BTree` and `Dict`.

use crate::error::{Error, Result};

/// Degree used when none is given. A node then splits once it would reach
/// 400 keys.
pub const DEFAULT_DEGREE: usize = 200;

/// Largest accepted degree: `2 * degree` must still fit in a `usize`.
pub const MAX_DEGREE: usize = usize::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeConfig {
    /// Branching parameter `b`: nodes hold `b-1..=2b-1` keys (root excepted).
    pub degree: usize,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
        }
    }
}

impl BTreeConfig {
    pub fn with_degree(degree: usize) -> Self {
        Self { degree }
    }

    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_DEGREE).contains(&self.degree) {
            return Err(Error::InvalidDegree {
                degree: self.degree,
            });
        }
        Ok(())
    }

    pub fn max_keys(&self) -> usize {
        self.degree.saturating_mul(2) - 1
    }

    pub fn min_keys(&self) -> usize {
        self.degree - 1
    }
}

/// Sizing and growth policy of a `Dict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictConfig {
    /// Capacity of a fresh table. Power of two.
    pub min_capacity: usize,
    /// Load factor as `load_numerator / load_denominator`.
    pub load_numerator: usize,
    pub load_denominator: usize,
    /// Growth target multiplier while `used <= large_table_threshold`.
    pub small_growth: usize,
    /// Growth target multiplier past `large_table_threshold`.
    pub large_growth: usize,
    pub large_table_threshold: usize,
}

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            min_capacity: 8,
            load_numerator: 2,
            load_denominator: 3,
            small_growth: 4,
            large_growth: 2,
            large_table_threshold: 50_000,
        }
    }
}

impl DictConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_capacity < 4 || !self.min_capacity.is_power_of_two() {
            return Err(Error::InvalidConfig(
                "min_capacity must be a power of two of at least 4",
            ));
        }
        if self.load_numerator == 0 || self.load_numerator >= self.load_denominator {
            return Err(Error::InvalidConfig("load factor must lie strictly between 0 and 1"));
        }
        if self.small_growth < 2 || self.large_growth < 2 {
            return Err(Error::InvalidConfig("growth factors must be at least 2"));
        }
        Ok(())
    }

    /// Number of entries (active plus tombstones) a table of `capacity`
    /// slots may hold.
    pub fn usable(&self, capacity: usize) -> usize {
        // Widen so large capacities cannot overflow the multiply.
        (capacity as u128 * self.load_numerator as u128 / self.load_denominator as u128) as usize
    }

    /// Smallest admissible capacity whose usable fraction fits `entries`.
    pub fn capacity_for(&self, entries: usize) -> Result<usize> {
        let mut capacity = self.min_capacity;
        while self.usable(capacity) < entries {
            capacity = capacity
                .checked_mul(2)
                .ok_or(Error::CapacityOverflow { requested: entries })?;
        }
        Ok(capacity)
    }

    /// Capacity to rebuild into when a table holding `used` live entries
    /// runs out of usable slots.
    pub fn grown_capacity(&self, used: usize) -> Result<usize> {
        let factor = if used > self.large_table_threshold {
            self.large_growth
        } else {
            self.small_growth
        };
        let target = used.saturating_mul(factor);
        let mut capacity = self.min_capacity;
        while capacity <= target || self.usable(capacity) <= used {
            capacity = capacity
                .checked_mul(2)
                .ok_or(Error::CapacityOverflow { requested: used + 1 })?;
        }
        Ok(capacity)
    }
}
