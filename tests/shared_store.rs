//! Tests for views sharing a log through a store.

use object_history::{
    Entry, HistoryConfig, HistoryOptions, LogStore, MemoryStore, Object, ObjectHistory,
    SharedLog, StoreBinding,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn obj(value: Value) -> Object {
    value.as_object().cloned().unwrap()
}

fn bound(store: &Arc<MemoryStore>, key: &str) -> HistoryConfig {
    HistoryConfig::default().with_store(StoreBinding::new(store.clone(), key).unwrap())
}

#[test]
fn test_views_converge_on_same_key() {
    let store = Arc::new(MemoryStore::new());

    let a = ObjectHistory::open(Some(json!({"a": "1", "b": "2"})), None, bound(&store, "k")).unwrap();
    a.merge(json!({"c": "3"})).unwrap();

    let b = ObjectHistory::open(None, None, bound(&store, "k")).unwrap();
    assert_eq!(b.get("c"), Some(json!("3")));
    assert_eq!(b.history_len(), 2);

    // Appends through either view are visible to both
    b.set("d", json!("4")).unwrap();
    assert_eq!(a.value(), obj(json!({"a": "1", "b": "2", "c": "3", "d": "4"})));
    assert_eq!(a.history_len(), 3);
}

#[test]
fn test_attach_merges_initial_data() {
    let store = Arc::new(MemoryStore::new());

    let a = ObjectHistory::open(Some(json!({"a": 1})), None, bound(&store, "k")).unwrap();
    let b = ObjectHistory::open(Some(json!({"b": 2})), None, bound(&store, "k")).unwrap();

    assert_eq!(a.value(), obj(json!({"a": 1, "b": 2})));
    assert_eq!(b.history_len(), 2);
    assert_eq!(b.at(0).unwrap(), Some(obj(json!({"a": 1}))));
}

#[test]
fn test_keys_are_isolated() {
    let store = Arc::new(MemoryStore::new());

    let a = ObjectHistory::open(Some(json!({"a": 1})), None, bound(&store, "one")).unwrap();
    let b = ObjectHistory::open(Some(json!({"b": 2})), None, bound(&store, "two")).unwrap();
    a.set("x", json!(true)).unwrap();

    assert_eq!(b.value(), obj(json!({"b": 2})));
    assert_eq!(store.keys(), vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn test_fresh_log_is_written_to_store() {
    let store = Arc::new(MemoryStore::new());
    assert!(store.is_empty());

    let _view = ObjectHistory::open(Some(json!({"a": 1})), None, bound(&store, "k")).unwrap();

    let log = store.get("k").unwrap();
    assert_eq!(log.read().len(), 1);
    assert_eq!(log.read().latest().unwrap(), obj(json!({"a": 1})));
}

#[test]
fn test_existing_log_keeps_its_options() {
    let store = Arc::new(MemoryStore::new());
    let limited = bound(&store, "k").with_options(HistoryOptions::default().with_retention_limit(2));

    let a = ObjectHistory::open(Some(json!({"n": 0})), None, limited).unwrap();
    let b = ObjectHistory::open(None, None, bound(&store, "k")).unwrap();

    for n in 1..5 {
        b.set("n", json!(n)).unwrap();
    }
    assert_eq!(b.options().retention_limit(), 2);
    assert_eq!(a.history_len(), 2);
    assert_eq!(a.get("n"), Some(json!(4)));
}

#[test]
fn test_seed_ignored_when_store_has_log() {
    let store = Arc::new(MemoryStore::new());
    let _a = ObjectHistory::open(Some(json!({"a": 1})), None, bound(&store, "k")).unwrap();

    let seed = vec![Entry::merge(json!({"other": true})).unwrap()];
    let b = ObjectHistory::open(None, Some(seed), bound(&store, "k")).unwrap();

    assert_eq!(b.value(), obj(json!({"a": 1})));
    assert_eq!(b.history_len(), 1);
}

#[test]
fn test_seed_populates_new_shared_log() {
    let store = Arc::new(MemoryStore::new());
    let seed = vec![
        Entry::merge(json!({"a": 1})).unwrap(),
        Entry::merge(json!({"b": 2})).unwrap(),
    ];

    let _a = ObjectHistory::open(None, Some(seed), bound(&store, "k")).unwrap();
    let b = ObjectHistory::open(None, None, bound(&store, "k")).unwrap();

    assert_eq!(b.value(), obj(json!({"a": 1, "b": 2})));
    assert_eq!(b.history_len(), 3);
}

/// A store that records every write, to check the write-back contract.
#[derive(Default)]
struct RecordingStore {
    logs: Mutex<HashMap<String, SharedLog>>,
    writes: Mutex<Vec<String>>,
}

impl LogStore for RecordingStore {
    fn get(&self, key: &str) -> Option<SharedLog> {
        self.logs.lock().get(key).cloned()
    }

    fn set(&self, key: &str, log: SharedLog) {
        self.writes.lock().push(key.to_string());
        self.logs.lock().insert(key.to_string(), log);
    }
}

#[test]
fn test_every_append_writes_back() {
    let store = Arc::new(RecordingStore::default());
    let binding = StoreBinding::new(store.clone(), "doc").unwrap();

    let v = ObjectHistory::open(
        Some(json!({"a": 1})),
        None,
        HistoryConfig::default().with_store(binding),
    )
    .unwrap();
    v.set("b", json!(2)).unwrap();
    v.remove("a").unwrap();

    // construction + two appends
    assert_eq!(store.writes.lock().len(), 3);
    assert!(store.writes.lock().iter().all(|key| key == "doc"));

    // A failed append does not write
    assert!(v.merge(json!("nope")).is_err());
    assert_eq!(store.writes.lock().len(), 3);
}
