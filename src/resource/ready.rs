//! Resolved resources of one request.

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::ResourceValue;

/// Concurrent, write-once `key -> value` map scoped to one request.
///
/// The first value stored under a key wins; later inserts are no-ops.
#[derive(Debug, Default)]
pub struct ReadyResources {
    values: DashMap<String, ResourceValue>,
}

impl ReadyResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value. Returns `false` if the key was already resolved.
    pub fn insert(&self, key: &str, value: serde_json::Value) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.values.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(value));
                true
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Check that every key is resolved.
    pub fn contains_all<'a>(&self, mut keys: impl Iterator<Item = &'a String>) -> bool {
        keys.all(|key| self.contains(key))
    }

    pub fn get(&self, key: &str) -> Option<ResourceValue> {
        self.values.get(key).map(|v| Arc::clone(v.value()))
    }

    /// Copy out the values for `keys`; unresolved keys are skipped.
    pub fn snapshot<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> FxHashMap<String, ResourceValue> {
        keys.into_iter()
            .filter_map(|key| self.get(key).map(|v| (key.clone(), v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
