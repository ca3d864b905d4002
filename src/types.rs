//! Core types for versioned objects.

use crate::error::{HistoryError, Result};
use crate::validation::{is_plain_object, type_name};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A resolved state: a plain key-value object.
pub type Object = serde_json::Map<String, Value>;

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. A clock set before the epoch reads as zero.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// The kind of state transition an entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Shallow overlay of the payload onto the previous state.
    #[default]
    Merge,
    /// The payload becomes the whole state.
    Replace,
    /// Remove one key from the previous state.
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Merge => "merge",
            Operation::Replace => "replace",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged state transition.
///
/// `data` is an object for merge and replace, and a key name for delete.
/// `value` caches the resolved state after this entry; the log may clear it
/// to bound memory, in which case lookups replay instead.
///
/// The serialized form is the history wire format:
///
/// ```text
/// {"timestamp":1700000000000,"operation":"merge","data":{"c":"3"},"value":{"a":"1","c":"3"}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// When the entry was appended.
    pub timestamp: Timestamp,

    pub operation: Operation,

    /// Operation payload.
    pub data: Value,

    /// Cached resolved state (`null` once cleared).
    #[serde(default)]
    pub value: Option<Object>,
}

impl Entry {
    /// Build an entry, validating the payload shape for the operation.
    ///
    /// Merge and replace require a plain object. Delete requires a string
    /// key; numeric keys are normalized to their decimal form.
    pub fn new(data: Value, operation: Operation) -> Result<Self> {
        let data = match operation {
            Operation::Merge | Operation::Replace => {
                if !is_plain_object(&data) {
                    return Err(HistoryError::InvalidPayload(format!(
                        "{} expects a plain object, got {}",
                        operation,
                        type_name(&data)
                    )));
                }
                data
            }
            Operation::Delete => match data {
                Value::String(_) => data,
                Value::Number(n) => Value::String(n.to_string()),
                other => {
                    return Err(HistoryError::InvalidPayload(format!(
                        "delete expects a key name, got {}",
                        type_name(&other)
                    )))
                }
            },
        };

        Ok(Self {
            timestamp: Timestamp::now(),
            operation,
            data,
            value: None,
        })
    }

    /// Merge entry.
    pub fn merge(data: Value) -> Result<Self> {
        Self::new(data, Operation::Merge)
    }

    /// Replace entry.
    pub fn replace(data: Value) -> Result<Self> {
        Self::new(data, Operation::Replace)
    }

    /// Delete entry for `key`.
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            timestamp: Timestamp::now(),
            operation: Operation::Delete,
            data: Value::String(key.into()),
            value: None,
        }
    }

    /// Whether this entry still carries its cached snapshot.
    pub fn has_snapshot(&self) -> bool {
        self.value.is_some()
    }
}

/// Parse a history previously produced by [`entries_to_json`] (or by any
/// `list()` serialization). Entries are not validated; malformed payloads
/// surface when the history is resolved.
pub fn entries_from_json(json: &str) -> Result<Vec<Entry>> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a history to its JSON wire format.
pub fn entries_to_json(entries: &[Entry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}
