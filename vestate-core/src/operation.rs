//! Opaque identities for in-flight operations.
//!
//! Drivers never compare operations by value. Each adopted or cached
//! operation receives a fresh [`OperationId`], and a settling operation may
//! only write state while its id is still the one the driver is honoring.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one adopted or cached operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    /// Returns the raw generation number.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Monotonically increasing source of [`OperationId`]s.
#[derive(Debug, Default)]
pub struct OperationIds {
    counter: AtomicU64,
}

impl OperationIds {
    /// Creates a generator starting at generation `0`.
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Allocates the next id. Ids are never reused by the same generator.
    pub fn next_id(&self) -> OperationId {
        OperationId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}
