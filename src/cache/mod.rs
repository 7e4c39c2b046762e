//! Thread-safe key/value cache holding the current configuration snapshot.

mod persistence;


use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Internally synchronized key/value store.
///
/// Readers never block on I/O. A poisoned lock is recovered rather than
/// propagated since every write leaves the map in a consistent state.
#[derive(Debug, Default)]
pub struct Cache {
    kv: RwLock<HashMap<String, String>>,
}

impl Cache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    /// Inserts or replaces the value stored under `key`.
    pub fn set(&self, key: &str, value: &str) {
        self.write().insert(key.to_string(), value.to_string());
    }

    /// Removes `key`; absent keys are ignored.
    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    /// Returns an owned copy of the whole mapping.
    pub fn dump(&self) -> HashMap<String, String> {
        self.read().clone()
    }

    /// Returns all keys currently stored, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replaces the whole mapping in a single write.
    pub(crate) fn replace(&self, kv: HashMap<String, String>) {
        *self.write() = kv;
    }

    /// Applies removals and upserts under one write lock so readers never
    /// observe a half-applied update.
    pub(crate) fn apply<'a>(
        &self,
        removed: impl IntoIterator<Item = &'a str>,
        upserted: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let mut kv = self.write();
        for key in removed {
            kv.remove(key);
        }
        for (key, value) in upserted {
            kv.insert(key.to_string(), value.to_string());
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        match self.kv.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        match self.kv.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
