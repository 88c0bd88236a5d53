//! Swap-on-write holder for cycle results.
//!
//! A cycle builds a complete new value and then replaces the cell's
//! reference in one step. Readers holding the previous `Arc` keep a
//! consistent view; nobody ever sees a half-updated result set.

use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
}

impl<T: Default> SnapshotCell<T> {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(T::default())),
        }
    }
}

impl<T> SnapshotCell<T> {
    /// The latest complete value.
    pub fn load(&self) -> Arc<T> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `value` as the current one.
    pub fn replace(&self, value: T) {
        let next = Arc::new(value);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
