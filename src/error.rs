//! Error type shared by both containers.

use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures a container operation can report.
///
/// A missing key is never an error: lookups answer with `bool`/`Option`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid btree degree {degree}: must be between 2 and usize::MAX / 2")]
    InvalidDegree { degree: usize },
    #[error("invalid dict config: {0}")]
    InvalidConfig(&'static str),
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
    #[error("capacity overflow: cannot size a table for {requested} entries")]
    CapacityOverflow { requested: usize },
}
