//! Per-key serialization of pipeline stages.
//!
//! Requests touching the same working directory (`{tag}/{pool}`) run one at a time; unrelated
//! keys proceed in parallel. Entries are dropped once nobody holds or waits for them, so the map
//! only ever contains keys with work in flight.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    entries: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and hold it until the guard is dropped.
    pub async fn acquire(&self, key: impl Into<String>) -> KeyGuard {
        let key = key.into();
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = entry.lock_owned().await;

        KeyGuard {
            key,
            entries: self.entries.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys with a holder or waiters.
    pub fn active_keys(&self) -> usize {
        self.entries.len()
    }
}

/// Holds one key of [`KeyedLocks`].
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    entries: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only counts the map and any waiters.
        self.guard.take();
        self.entries
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
