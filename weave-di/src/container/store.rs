//! Registration store

use super::registration::Registration;
use crate::ServiceKey;
use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 64;

/// Thread-safe mapping from [`ServiceKey`] to its current [`Registration`].
///
/// Writes to the same key are serialized by the owning shard lock, a reader sees
/// either the old or the new record, never a mix. Records are handed out as `Arc`s
/// so no shard lock is held while a factory runs.
///
/// A write that has to observe the current record before replacing it
/// (validate, then put) runs under the key's write lock, see [`RegistrationStore::write_lock`].
#[derive(Debug)]
pub(crate) struct RegistrationStore {
    entries: DashMap<ServiceKey, Arc<Registration>>,
    write_locks: DashMap<ServiceKey, Arc<ReentrantMutex<()>>>,
}

impl Default for RegistrationStore {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationStore {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::with_capacity(DEFAULT_CAPACITY),
            write_locks: DashMap::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Returns the lock that serializes writers of `key`.
    ///
    /// Re-entrant, so a plugin hook may register the same key from the writing thread.
    pub(crate) fn write_lock(&self, key: &ServiceKey) -> Arc<ReentrantMutex<()>> {
        if let Some(lock) = self.write_locks.get(key) {
            return lock.value().clone();
        }
        self.write_locks
            .entry(key.clone())
            .or_default()
            .value()
            .clone()
    }

    /// Stores or replaces a registration, returns the replaced one
    #[inline]
    pub(crate) fn put(&self, registration: Registration) -> Option<Arc<Registration>> {
        self.entries.insert(registration.key().clone(), Arc::new(registration))
    }

    #[inline]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
    }

    #[inline]
    pub(crate) fn remove(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.entries
            .remove(key)
            .map(|(_, registration)| registration)
    }

    #[inline]
    pub(crate) fn remove_all(&self) {
        self.entries.clear();
    }

    #[inline]
    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> Vec<ServiceKey> {
        let mut keys = self.entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }
}
