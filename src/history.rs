//! The versioned object tying the log, the store and subscriptions together.

use crate::config::{HistoryConfig, HistoryOptions};
use crate::error::{HistoryError, Result};
use crate::records::EntryLog;
use crate::store::{SharedLog, StoreBinding};
use crate::subscriptions::{
    ChangeEvent, ObserverError, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::types::{Entry, Object, Operation};
use crate::validation::type_name;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Snapshot of a history's configuration, entries and current value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryInfo {
    pub options: HistoryOptions,
    pub list: Vec<Entry>,
    pub value: Object,
}

/// A key-value object whose every mutation is recorded.
///
/// Writes never modify state in place: [`set`](Self::set),
/// [`merge`](Self::merge), [`replace`](Self::replace) and
/// [`remove`](Self::remove) each append an [`Entry`] to the underlying log.
/// Reads ([`get`](Self::get), [`keys`](Self::keys), [`value`](Self::value))
/// reflect the newest resolved value, and [`at`](Self::at) resolves any
/// earlier point in history.
///
/// All returned objects and entries are owned copies.
///
/// # Example
///
/// ```
/// use object_history::ObjectHistory;
/// use serde_json::json;
///
/// let history = ObjectHistory::new(json!({"a": "1", "b": "2"})).unwrap();
/// history.merge(json!({"c": "3"})).unwrap();
/// history.remove("b").unwrap();
///
/// assert_eq!(history.to_string(), r#"{"a":"1","c":"3"}"#);
/// assert_eq!(history.at(0).unwrap().unwrap()["b"], "2");
/// assert_eq!(history.history_len(), 3);
/// ```
pub struct ObjectHistory {
    log: SharedLog,
    binding: Option<StoreBinding>,
    subscriptions: SubscriptionManager,
}

impl ObjectHistory {
    /// Create a history seeded with `initial` and default options.
    ///
    /// `initial` must be an object or `null`.
    pub fn new(initial: Value) -> Result<Self> {
        Self::open(Some(initial), None, HistoryConfig::default())
    }

    /// Create or attach a history.
    ///
    /// - `initial`: starting data; must be an object when present (`null`
    ///   counts as absent).
    /// - `seed`: a previously listed history. When non-empty it becomes the
    ///   log before `initial` is appended on top.
    /// - `config`: options and an optional store binding.
    ///
    /// A fresh log always receives one merge entry holding `initial` (the
    /// empty object when absent). When the store already holds a log for the
    /// bound key, the view attaches to it, appends `initial` only if given,
    /// and ignores `seed` and `config.options`.
    pub fn open(
        initial: Option<Value>,
        seed: Option<Vec<Entry>>,
        config: HistoryConfig,
    ) -> Result<Self> {
        let initial = match initial {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(HistoryError::InvalidArgument(format!(
                    "initial data must be an object, got {}",
                    type_name(&other)
                )))
            }
        };

        let HistoryConfig { options, store } = config;

        let attached = store.as_ref().and_then(StoreBinding::fetch);
        let log = match attached {
            Some(log) => {
                if seed.as_ref().is_some_and(|s| !s.is_empty()) {
                    tracing::warn!(
                        key = ?store.as_ref().map(StoreBinding::key),
                        "store already holds a log for this key; ignoring seed history"
                    );
                }
                if let Some(initial) = initial {
                    log.write().append(Value::Object(initial), Operation::Merge)?;
                }
                tracing::debug!(
                    key = ?store.as_ref().map(StoreBinding::key),
                    len = log.read().len(),
                    "attached to shared log"
                );
                log
            }
            None => {
                let mut log = match seed {
                    Some(entries) if !entries.is_empty() => EntryLog::from_entries(entries, options),
                    _ => EntryLog::new(options),
                };
                log.append(Value::Object(initial.unwrap_or_default()), Operation::Merge)?;
                Arc::new(RwLock::new(log))
            }
        };

        if let Some(binding) = &store {
            binding.publish(&log);
        }

        Ok(Self {
            log,
            binding: store,
            subscriptions: SubscriptionManager::new(),
        })
    }

    // --- Reads ---

    /// Current resolved value.
    ///
    /// A log attached from a store that holds only a malformed ingested
    /// history reads as the empty object (the replay error is logged at warn
    /// level); [`latest`](Self::latest) reports the error itself.
    pub fn value(&self) -> Object {
        current_value(&self.log.read(), self.store_key())
    }

    /// Value for `key` in the current state.
    pub fn get(&self, key: &str) -> Option<Value> {
        let log = self.log.read();
        match log.current() {
            Some(value) => value.get(key).cloned(),
            None => current_value(&log, self.store_key()).remove(key),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys of the current state, in canonical (sorted) order.
    pub fn keys(&self) -> Vec<String> {
        self.value().keys().cloned().collect()
    }

    /// Values of the current state, in key order.
    pub fn values(&self) -> Vec<Value> {
        self.value().into_iter().map(|(_, v)| v).collect()
    }

    /// Number of keys in the current state.
    pub fn len(&self) -> usize {
        self.value().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolved value at `index` (negative counts from the end).
    ///
    /// `Ok(None)` for an out-of-range index. Errors only when replay runs
    /// through a malformed entry from an ingested history.
    pub fn at(&self, index: i64) -> Result<Option<Object>> {
        self.log.read().at(index)
    }

    /// Resolved value of the newest entry. Same as `at(-1)`.
    pub fn latest(&self) -> Result<Object> {
        self.log.read().latest()
    }

    /// Owned copy of the history, oldest first.
    pub fn list(&self) -> Vec<Entry> {
        self.log.read().list()
    }

    /// Number of entries in the history.
    pub fn history_len(&self) -> usize {
        self.log.read().len()
    }

    /// Options of the underlying log.
    pub fn options(&self) -> HistoryOptions {
        *self.log.read().options()
    }

    pub fn info(&self) -> HistoryInfo {
        let log = self.log.read();
        HistoryInfo {
            options: *log.options(),
            list: log.list(),
            value: current_value(&log, self.store_key()),
        }
    }

    /// Key of the shared store binding, if any.
    pub fn store_key(&self) -> Option<&str> {
        self.binding.as_ref().map(StoreBinding::key)
    }

    // --- Writes ---

    /// Set one key. Recorded as a merge with a single-key payload.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<Object> {
        let mut data = Object::new();
        data.insert(key.into(), value);
        self.append(Value::Object(data), Operation::Merge)
    }

    /// Remove one key. A delete entry is appended even if the key is absent.
    pub fn remove(&self, key: impl Into<String>) -> Result<Object> {
        self.append(Value::String(key.into()), Operation::Delete)
    }

    /// Shallow-merge `data` (a plain object) into the current state.
    pub fn merge(&self, data: Value) -> Result<Object> {
        self.append(data, Operation::Merge)
    }

    /// Replace the whole state with `data` (a plain object).
    pub fn replace(&self, data: Value) -> Result<Object> {
        self.append(data, Operation::Replace)
    }

    /// Append an entry and return the new resolved value.
    ///
    /// After the log is updated the store binding (if any) is refreshed and
    /// subscribers are notified. If an observer fails, the entry stays
    /// committed and the observer's error is returned.
    pub fn append(&self, data: Value, operation: Operation) -> Result<Object> {
        let (entry, value, length) = {
            let mut log = self.log.write();
            let (entry, value) = log.append(data, operation)?;
            (entry, value, log.len())
        };

        if let Some(binding) = &self.binding {
            binding.publish(&self.log);
        }

        self.subscriptions.notify(&ChangeEvent {
            entry,
            value: value.clone(),
            length,
        })?;

        Ok(value)
    }

    // --- Subscriptions ---

    /// Register an observer called synchronously after every append.
    pub fn on_change<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) -> std::result::Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.subscriptions.on_change(observer)
    }

    /// Subscribe to changes through a bounded channel.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }
}

/// Newest cached snapshot, or a replay when the log has never been appended
/// to through this crate. A replay failure reads as the empty object.
fn current_value(log: &EntryLog, key: Option<&str>) -> Object {
    if let Some(value) = log.current() {
        return value.clone();
    }
    log.latest().unwrap_or_else(|e| {
        tracing::warn!(key = ?key, error = %e, "history does not resolve; reading as empty");
        Object::new()
    })
}

impl fmt::Display for ObjectHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.value()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl fmt::Debug for ObjectHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHistory: {}", self)
    }
}

impl Serialize for ObjectHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LogStore, MemoryStore};
    use serde_json::json;

    fn obj(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_and_value() {
        let history = ObjectHistory::new(json!({"a": "1", "b": "2"})).unwrap();

        assert_eq!(history.value(), obj(json!({"a": "1", "b": "2"})));
        assert_eq!(history.history_len(), 1);
        assert_eq!(history.keys(), vec!["a", "b"]);
        assert_eq!(history.values(), vec![json!("1"), json!("2")]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.get("a"), Some(json!("1")));
        assert!(history.get("z").is_none());
    }

    #[test]
    fn test_empty_initial() {
        for initial in [None, Some(json!(null)), Some(json!({}))] {
            let history = ObjectHistory::open(initial, None, HistoryConfig::default()).unwrap();
            assert!(history.is_empty());
            assert_eq!(history.history_len(), 1);
            assert_eq!(history.to_string(), "{}");
        }
    }

    #[test]
    fn test_invalid_initial() {
        for bad in [json!("text"), json!(3), json!([1, 2]), json!(true)] {
            let result = ObjectHistory::new(bad);
            assert!(matches!(result, Err(HistoryError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_set_and_remove() {
        let history = ObjectHistory::new(json!({"a": 1})).unwrap();

        history.set("b", json!(2)).unwrap();
        assert_eq!(history.value(), obj(json!({"a": 1, "b": 2})));

        history.remove("a").unwrap();
        assert_eq!(history.value(), obj(json!({"b": 2})));
        assert!(!history.contains_key("a"));
        assert_eq!(history.history_len(), 3);

        let last = history.list().pop().unwrap();
        assert_eq!(last.operation, Operation::Delete);
        assert_eq!(last.data, json!("a"));
    }

    #[test]
    fn test_returned_value_is_a_copy() {
        let history = ObjectHistory::new(json!({"a": 1})).unwrap();

        let mut value = history.value();
        value.insert("b".to_string(), json!(2));
        value.remove("a");

        assert_eq!(history.value(), obj(json!({"a": 1})));
    }

    #[test]
    fn test_info() {
        let history = ObjectHistory::new(json!({"a": "1"})).unwrap();
        history.set("b", json!("2")).unwrap();

        let info = history.info();
        assert_eq!(info.options, HistoryOptions::default());
        assert_eq!(info.list, history.list());
        assert_eq!(info.value, history.value());

        let encoded = serde_json::to_value(&info).unwrap();
        assert_eq!(encoded["options"], json!({"retentionLimit": 0, "snapshotWindow": 1}));
        assert_eq!(encoded["list"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_display_debug_serialize() {
        let history = ObjectHistory::new(json!({"b": "2", "a": "1"})).unwrap();

        assert_eq!(history.to_string(), r#"{"a":"1","b":"2"}"#);
        assert_eq!(format!("{:?}", history), r#"ObjectHistory: {"a":"1","b":"2"}"#);
        assert_eq!(
            serde_json::to_value(&history).unwrap(),
            json!({"a": "1", "b": "2"})
        );
    }

    #[test]
    fn test_malformed_shared_log_reads_as_empty() {
        let seed = vec![Entry {
            timestamp: crate::types::Timestamp(0),
            operation: Operation::Replace,
            data: json!("oops"),
            value: None,
        }];
        let store = Arc::new(MemoryStore::new());
        let log: SharedLog = Arc::new(RwLock::new(EntryLog::from_entries(
            seed,
            HistoryOptions::default(),
        )));
        store.set("k", log);

        let binding = StoreBinding::new(store, "k").unwrap();
        let history =
            ObjectHistory::open(None, None, HistoryConfig::default().with_store(binding)).unwrap();

        assert!(history.value().is_empty());
        assert_eq!(history.get("a"), None);
        assert!(history.info().value.is_empty());
        assert!(matches!(history.at(-1), Err(HistoryError::InvalidPayload(_))));
        assert!(matches!(history.latest(), Err(HistoryError::InvalidPayload(_))));
    }

    #[test]
    fn test_store_key() {
        let store = Arc::new(MemoryStore::new());
        let binding = StoreBinding::new(store, "k").unwrap();
        let history =
            ObjectHistory::open(None, None, HistoryConfig::default().with_store(binding)).unwrap();

        assert_eq!(history.store_key(), Some("k"));
        assert_eq!(ObjectHistory::new(json!({})).unwrap().store_key(), None);
    }
}
