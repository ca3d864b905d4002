//! History configuration.

use crate::error::{HistoryError, Result};
use crate::store::StoreBinding;
use crate::validation::{natural_number, type_name};
use serde::Serialize;
use serde_json::Value;

/// Memory policy for a log.
///
/// - `retention_limit`: maximum number of entries kept (0 = unbounded).
/// - `snapshot_window`: number of newest entries that keep their cached
///   snapshot when retention is unbounded (0 = every entry keeps it).
///
/// A retention limit forces the effective snapshot window to 0: after
/// eviction the oldest surviving entry is the new origin, so every retained
/// entry must keep its snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOptions {
    retention_limit: usize,
    snapshot_window: usize,
}

impl HistoryOptions {
    /// Default snapshot window: only the newest entry keeps its snapshot.
    pub const DEFAULT_SNAPSHOT_WINDOW: usize = 1;

    pub fn new(retention_limit: usize, snapshot_window: usize) -> Self {
        Self {
            retention_limit,
            snapshot_window: if retention_limit > 0 { 0 } else { snapshot_window },
        }
    }

    pub fn with_retention_limit(self, retention_limit: usize) -> Self {
        Self::new(retention_limit, self.snapshot_window)
    }

    pub fn with_snapshot_window(self, snapshot_window: usize) -> Self {
        Self::new(self.retention_limit, snapshot_window)
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Effective snapshot window (always 0 under a retention limit).
    pub fn snapshot_window(&self) -> usize {
        self.snapshot_window
    }

    /// Parse loosely typed options.
    ///
    /// `null` yields the defaults. Otherwise `options` must be an object;
    /// `retentionLimit` (alias `limit`) and `snapshotWindow` (alias
    /// `skipDelta`) must be natural numbers, numeric strings included.
    /// Unknown keys are ignored.
    pub fn from_json(options: &Value) -> Result<Self> {
        let map = match options {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(HistoryError::InvalidOptions(format!(
                    "options must be an object, got {}",
                    type_name(other)
                )))
            }
        };

        let field = |names: &[&str], default: usize| -> Result<usize> {
            let found = names
                .iter()
                .find_map(|name| map.get(*name).map(|value| (*name, value)));
            match found {
                None => Ok(default),
                Some((name, value)) => natural_number(value).ok_or_else(|| {
                    HistoryError::InvalidOptions(format!(
                        "option {name}: {value} is not a non-negative integer"
                    ))
                }),
            }
        };

        let retention_limit = field(&["retentionLimit", "limit"], 0)?;
        let snapshot_window = field(
            &["snapshotWindow", "skipDelta"],
            Self::DEFAULT_SNAPSHOT_WINDOW,
        )?;

        Ok(Self::new(retention_limit, snapshot_window))
    }
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SNAPSHOT_WINDOW)
    }
}

/// Construction settings for an [`ObjectHistory`](crate::ObjectHistory).
#[derive(Clone, Debug, Default)]
pub struct HistoryConfig {
    /// Policy for a newly created log. A log attached from a store keeps
    /// the options it was created with.
    pub options: HistoryOptions,

    /// Optional shared-store binding.
    pub store: Option<StoreBinding>,
}

impl HistoryConfig {
    pub fn with_options(mut self, options: HistoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_store(mut self, binding: StoreBinding) -> Self {
        self.store = Some(binding);
        self
    }
}
