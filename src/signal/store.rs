//! Signal snapshots: every value produced by one evaluation cycle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::snapshot::SnapshotCell;

use super::engine::SignalValue;

/// All signal values produced by one evaluation cycle.
#[derive(Debug, Clone, Default)]
pub struct SignalSnapshot {
    /// Tick at which this snapshot was produced.
    pub tick: u64,
    values: HashMap<String, Arc<SignalValue>>,
}

impl SignalSnapshot {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Arc<SignalValue>) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.values.get(name).map(Arc::as_ref)
    }

    /// Shared handle to a signal's value.
    pub fn shared(&self, name: &str) -> Option<Arc<SignalValue>> {
        self.values.get(name).cloned()
    }

    /// Global scalar of a signal.
    pub fn global(&self, name: &str) -> Option<f64> {
        self.get(name).map(|v| v.global)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Signal names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// A new snapshot carrying every value of `self` with `updates` laid over it.
    pub fn merged(&self, tick: u64, updates: impl IntoIterator<Item = (String, Arc<SignalValue>)>) -> Self {
        let mut next = Self {
            tick,
            values: self.values.clone(),
        };
        next.values.extend(updates);
        next
    }
}

/// Holds the current signal snapshot; writers replace it wholesale.
pub type SignalStore = SnapshotCell<SignalSnapshot>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_keep_previous_snapshot_after_replace() {
        let store = SignalStore::new();
        let mut first = SignalSnapshot::new(1);
        first.insert("meals", Arc::new(SignalValue::scalar(3.0)));
        store.replace(first);

        let held = store.load();
        let mut second = SignalSnapshot::new(2);
        second.insert("meals", Arc::new(SignalValue::scalar(7.0)));
        store.replace(second);

        assert_eq!(held.global("meals"), Some(3.0));
        assert_eq!(store.load().global("meals"), Some(7.0));
        assert_eq!(store.load().tick, 2);
    }

    #[test]
    fn merged_overlays_updates() {
        let mut base = SignalSnapshot::new(1);
        base.insert("a", Arc::new(SignalValue::scalar(1.0)));
        base.insert("b", Arc::new(SignalValue::scalar(2.0)));
        let next = base.merged(5, [("b".to_string(), Arc::new(SignalValue::scalar(9.0)))]);
        assert_eq!(next.global("a"), Some(1.0));
        assert_eq!(next.global("b"), Some(9.0));
        assert_eq!(next.tick, 5);
        assert_eq!(base.global("b"), Some(2.0));
        assert_eq!(next.names(), vec!["a", "b"]);
    }
}
