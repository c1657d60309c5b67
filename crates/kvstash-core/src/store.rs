//! Guarded map: a `HashMap<String, String>` behind a single reader/writer lock.
//!
//! - `set` takes the write lock
//! - `get`, `search`, `len` take the read lock
//!
//! Guards are scoped to each call, so no lock is ever held across an await
//! point or returned to the caller.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory string store shared by every request handler.
///
/// Construct one per server (or per test) and share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct GuardedMap {
    map: RwLock<HashMap<String, String>>,
}

impl GuardedMap {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite `key`. Last write wins.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut map = self.write();
        map.insert(key.into(), value.into());
    }

    /// Value for `key`, or an empty string when absent.
    ///
    /// A missing key and a key stored with an empty value look the same.
    pub fn get(&self, key: &str) -> String {
        self.read().get(key).cloned().unwrap_or_default()
    }

    /// Keys starting with `prefix` and ending with `suffix`.
    ///
    /// Order follows the map's iteration order and is not stable.
    pub fn search(&self, prefix: &str, suffix: &str) -> Vec<String> {
        let mut keys = Vec::new();
        self.search_with(prefix, suffix, |k| keys.push(k.to_string()));
        keys
    }

    /// Visit every matching key while the read lock is held for the whole scan.
    pub fn search_with<F>(&self, prefix: &str, suffix: &str, mut f: F)
    where
        F: FnMut(&str),
    {
        let map = self.read();
        for key in map.keys() {
            if key.starts_with(prefix) && key.ends_with(suffix) {
                f(key);
            }
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A holder that panicked cannot leave the map half-written (every
    // mutation is a single insert), so poisoning is cleared instead of surfaced.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.map.read().unwrap_or_else(|e: PoisonError<_>| {
            tracing::warn!("store lock poisoned; recovering read guard");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.map.write().unwrap_or_else(|e: PoisonError<_>| {
            tracing::warn!("store lock poisoned; recovering write guard");
            e.into_inner()
        })
    }
}
