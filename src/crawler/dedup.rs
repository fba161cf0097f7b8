//! Item key deduplication
//!
//! The deduplicator is the uniqueness gate for the whole dataset. It is
//! seeded once from the persisted records and only ever grows.

use std::collections::HashSet;

/// Set of item keys already collected
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    keys: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the set from previously persisted keys
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Returns true if `key` has already been collected
    pub fn seen(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Marks `key` as collected
    ///
    /// Returns true if the key was not known before.
    pub fn mark(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
