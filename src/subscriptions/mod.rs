//! Change notifications for versioned objects.
//!
//! Two delivery styles are supported:
//! - Observers: closures called synchronously, in registration order,
//!   right after an append commits.
//! - Channel subscriptions: bounded buffers drained by the subscriber,
//!   with slow subscribers dropped.
//!
//! # Example
//!
//! ```
//! use object_history::{HistoryEvent, ObjectHistory, SubscriptionConfig};
//! use serde_json::json;
//!
//! let history = ObjectHistory::new(json!({"a": "1"})).unwrap();
//! history.on_change(|change| {
//!     println!("{} -> {:?}", change.entry.operation, change.value);
//!     Ok(())
//! });
//! let handle = history.subscribe(SubscriptionConfig::default());
//!
//! history.set("b", json!("2")).unwrap();
//! assert!(matches!(handle.try_recv(), Ok(HistoryEvent::Change { .. })));
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    ChangeEvent, DropReason, HistoryEvent, Observer, ObserverError, SubscriptionConfig,
    SubscriptionHandle, SubscriptionId,
};
