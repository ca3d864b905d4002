//! State reconstruction from entries.

use crate::error::{HistoryError, Result};
use crate::types::{Entry, Object, Operation};
use crate::validation::type_name;
use serde_json::Value;

/// Apply one entry to a previous state.
///
/// Entries built through [`Entry::new`] always fold cleanly; an error here
/// means the entry came from an ingested history with a malformed payload.
pub fn fold(prev: &Object, entry: &Entry) -> Result<Object> {
    match entry.operation {
        Operation::Merge => {
            let data = payload_object(entry)?;
            let mut next = prev.clone();
            next.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(next)
        }

        Operation::Replace => Ok(payload_object(entry)?.clone()),

        Operation::Delete => {
            let key = match &entry.data {
                Value::String(key) => key.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(HistoryError::InvalidPayload(format!(
                        "delete expects a key name, got {}",
                        type_name(other)
                    )))
                }
            };
            let mut next = prev.clone();
            next.remove(&key);
            Ok(next)
        }
    }
}

/// Fold a whole sequence of entries, starting from the empty object.
///
/// Cached snapshots are ignored: this is the reference result every cached
/// lookup must agree with.
pub fn fold_all<'a, I>(entries: I) -> Result<Object>
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries
        .into_iter()
        .try_fold(Object::new(), |state, entry| fold(&state, entry))
}

fn payload_object(entry: &Entry) -> Result<&Object> {
    entry.data.as_object().ok_or_else(|| {
        HistoryError::InvalidPayload(format!(
            "{} expects a plain object, got {}",
            entry.operation,
            type_name(&entry.data)
        ))
    })
}
