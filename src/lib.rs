//! # Object History
//!
//! An in-memory, append-only versioned object. Every mutation of a plain
//! key-value record is kept as an immutable entry, so both the current state
//! and any earlier state can be read back.
//!
//! ## Core Concepts
//!
//! - **Entries**: merge, replace or delete operations with their payload
//! - **Log**: ordered entries; the state at index `i` is the fold of `0..=i`
//! - **Snapshots**: resolved values cached on entries to avoid replay
//! - **Retention**: optional bound on the number of entries kept
//! - **Shared stores**: keyed registries letting several views share one log
//!
//! ## Example
//!
//! ```
//! use object_history::{HistoryConfig, HistoryOptions, MemoryStore, ObjectHistory, StoreBinding};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let config = HistoryConfig::default()
//!     .with_options(HistoryOptions::default().with_retention_limit(100))
//!     .with_store(StoreBinding::new(store.clone(), "profile")?);
//!
//! let a = ObjectHistory::open(Some(json!({"name": "Ada"})), None, config.clone())?;
//! a.set("role", json!("admin"))?;
//!
//! // A second view bound to the same key sees the same history
//! let b = ObjectHistory::open(None, None, config)?;
//! assert_eq!(b.get("role"), Some(json!("admin")));
//! assert_eq!(b.at(0)?.unwrap()["name"], "Ada");
//! # Ok::<(), object_history::HistoryError>(())
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod records;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod validation;

// Re-exports
pub use config::{HistoryConfig, HistoryOptions};
pub use error::{HistoryError, Result};
pub use history::{HistoryInfo, ObjectHistory};
pub use records::EntryLog;
pub use state::{fold, fold_all};
pub use store::{LogStore, MemoryStore, SharedLog, StoreBinding};
pub use subscriptions::{
    ChangeEvent, DropReason, HistoryEvent, Observer, ObserverError, SubscriptionConfig,
    SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use validation::{is_plain_object, natural_number};
