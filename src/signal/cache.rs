//! Tick-based TTL cache for computed signal values.
//!
//! Entries expire purely by elapsed ticks. There is no invalidation on
//! write: every producer uses the same key (the definition name) and the
//! same TTL.

use dashmap::DashMap;

/// A keyed cache whose entries live for `ttl` ticks.
#[derive(Debug)]
pub struct SignalCache<V> {
    ttl: u64,
    entries: DashMap<String, (u64, V)>,
}

impl<V: Clone> SignalCache<V> {
    pub fn new(ttl: u64) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// The cached value if it was stored fewer than `ttl` ticks before `now`.
    pub fn get(&self, key: &str, now: u64) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (stored_at, value) = entry.value();
        (now.saturating_sub(*stored_at) < self.ttl).then(|| value.clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: V, now: u64) {
        self.entries.insert(key.into(), (now, value));
    }

    /// Return the cached value or compute, store and return a fresh one.
    pub fn get_or_insert_with(&self, key: &str, now: u64, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(key, now) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone(), now);
        value
    }

    /// Reuse only a value stored on this same tick; anything older is
    /// recomputed and replaces the entry.
    pub fn refresh_with(&self, key: &str, now: u64, compute: impl FnOnce() -> V) -> V {
        if let Some(entry) = self.entries.get(key) {
            let (stored_at, value) = entry.value();
            if *stored_at == now {
                return value.clone();
            }
        }
        let value = compute();
        self.insert(key, value.clone(), now);
        value
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (stored_at, _)| now.saturating_sub(*stored_at) < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
