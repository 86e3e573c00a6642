//! Keyed store whose entries expire after a fixed time-to-live.
//!
//! Backed by [`cached::TimedCache`]: expired entries are invisible to every
//! read and are dropped when touched, or eagerly by
//! [`TtlStore::purge_expired`]. The TTL has whole-second resolution.

use std::hash::Hash;
use std::time::Duration;

use cached::{Cached, TimedCache};
use parking_lot::Mutex;

/// Concurrent `K → V` map with a per-store TTL.
pub struct TtlStore<K, V> {
    ttl_secs: u64,
    entries: Mutex<TimedCache<K, V>>,
}

impl<K, V> std::fmt::Debug for TtlStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A store whose entries live for `ttl_secs` seconds (at least one).
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        let ttl_secs = ttl_secs.max(1);
        Self {
            ttl_secs,
            entries: Mutex::new(TimedCache::with_lifespan(ttl_secs)),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Insert or replace `key`, restarting its TTL.
    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().cache_set(key, value);
    }

    /// The live value for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().cache_get(key).cloned()
    }

    /// Remove and return the live value for `key` if `accept` approves it.
    /// A rejected value stays in place with its original expiry.
    pub fn remove_if<F>(&self, key: &K, accept: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        let mut entries = self.entries.lock();
        if entries.cache_get(key).is_some_and(accept) {
            entries.cache_remove(key)
        } else {
            None
        }
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.cache_size();
        entries.flush();
        before - entries.cache_size()
    }

    /// Number of stored entries, expired ones included until purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().cache_size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
