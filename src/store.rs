//! Shared log registry.
//!
//! A [`LogStore`] maps string keys to logs so that several
//! [`ObjectHistory`](crate::ObjectHistory) views can present the same
//! history. The store is an explicit object owned by whoever creates it;
//! there is no process-wide registry.
//!
//! Access is assumed to be cooperative. Each append holds the log's write
//! lock, but nothing coordinates two writers that read a value, decide,
//! and then write on the same key.

use crate::error::{HistoryError, Result};
use crate::records::EntryLog;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A log that can be shared between views.
pub type SharedLog = Arc<RwLock<EntryLog>>;

/// Keyed get/set binding for shared logs.
///
/// Implementations must be immediately consistent: a `get` that follows a
/// `set` on the same key returns the log that was set.
pub trait LogStore: Send + Sync {
    /// Log stored under `key`, if any.
    fn get(&self, key: &str) -> Option<SharedLog>;

    /// Store `log` under `key`, replacing any previous log.
    fn set(&self, key: &str, log: SharedLog);
}

/// In-memory [`LogStore`].
#[derive(Default)]
pub struct MemoryStore {
    logs: RwLock<HashMap<String, SharedLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a log.
    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.read().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.logs.read().contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.logs.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove the log for `key`. Views already attached keep their handle.
    pub fn remove(&self, key: &str) -> Option<SharedLog> {
        self.logs.write().remove(key)
    }
}

impl LogStore for MemoryStore {
    fn get(&self, key: &str) -> Option<SharedLog> {
        self.logs.read().get(key).cloned()
    }

    fn set(&self, key: &str, log: SharedLog) {
        self.logs.write().insert(key.to_string(), log);
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.keys())
            .finish()
    }
}

/// A store together with the key a view reads and writes.
#[derive(Clone)]
pub struct StoreBinding {
    store: Arc<dyn LogStore>,
    key: String,
}

impl StoreBinding {
    /// Bind `key` in `store`. The key must not be empty or blank.
    pub fn new(store: Arc<dyn LogStore>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(HistoryError::InvalidStoreBinding(
                "store binding requires a non-empty key".to_string(),
            ));
        }
        Ok(Self { store, key })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Log currently stored under the bound key.
    pub(crate) fn fetch(&self) -> Option<SharedLog> {
        self.store.get(&self.key)
    }

    /// Write `log` back under the bound key.
    pub(crate) fn publish(&self, log: &SharedLog) {
        self.store.set(&self.key, Arc::clone(log));
    }
}

impl fmt::Debug for StoreBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBinding")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
