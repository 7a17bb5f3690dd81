//! Seen-nullifier bookkeeping for consuming applications.

use num_bigint::BigUint;
use std::collections::{HashMap, HashSet};

/// Records accepted user nullifiers per application-defined scope key.
#[derive(Debug, Clone, Default)]
pub struct NullifierRegistry {
    seen: HashMap<u64, HashSet<BigUint>>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, scope: u64, nullifier: &BigUint) -> bool {
        self.seen
            .get(&scope)
            .is_some_and(|set| set.contains(nullifier))
    }

    /// Record `nullifier` under `scope`. Returns `false` if it was already there.
    pub fn record(&mut self, scope: u64, nullifier: BigUint) -> bool {
        self.seen.entry(scope).or_default().insert(nullifier)
    }

    /// Number of nullifiers recorded under `scope`.
    pub fn count(&self, scope: u64) -> usize {
        self.seen.get(&scope).map_or(0, HashSet::len)
    }
}
