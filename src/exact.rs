use std::collections::BTreeSet;

use crate::precision::EXACT_THRESHOLD;

/// The exact tier: a small set of raw 64-bit hashes, used while the
/// observed cardinality is small enough to count precisely.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExactSet {
    hashes: BTreeSet<u64>,
}

impl ExactSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `hash`, returning true if it was not already present.
    pub(crate) fn insert(&mut self, hash: u64) -> bool {
        self.hashes.insert(hash)
    }

    pub(crate) fn len(&self) -> usize {
        self.hashes.len()
    }

    pub(crate) fn is_over_threshold(&self) -> bool {
        self.hashes.len() > EXACT_THRESHOLD
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.hashes.iter().copied()
    }

    pub(crate) fn union(&mut self, other: &Self) {
        self.hashes.extend(other.hashes.iter().copied());
    }
}
