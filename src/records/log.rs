//! Append-only entry log.

use crate::config::HistoryOptions;
use crate::error::Result;
use crate::state::fold;
use crate::types::{Entry, Object, Operation};
use serde_json::Value;

/// Append-only log of entries with a bounded snapshot cache.
///
/// The resolved value at position `i` is the fold of entries `0..=i` from
/// the empty object. Entries carry that value as a cached snapshot; which
/// entries keep it is decided by the [`HistoryOptions`]:
///
/// - with a retention limit, every retained entry keeps its snapshot and the
///   oldest retained entry acts as the origin of history;
/// - without one, only the newest `snapshot_window` entries keep theirs
///   (all of them when the window is 0).
#[derive(Clone, Debug, Default)]
pub struct EntryLog {
    entries: Vec<Entry>,

    options: HistoryOptions,

    /// Entries below this index are never cleared again: either their
    /// snapshot is already gone or it is the pinned origin of a seed.
    cleared_until: usize,
}

impl EntryLog {
    /// Create an empty log.
    pub fn new(options: HistoryOptions) -> Self {
        Self {
            entries: Vec::new(),
            options,
            cleared_until: 0,
        }
    }

    /// Create a log from an ingested history.
    ///
    /// The entries are taken as-is. Malformed payloads are not rejected here;
    /// they surface as [`HistoryError::InvalidPayload`](crate::HistoryError)
    /// when a lookup or append has to replay through them.
    ///
    /// A snapshot on the first entry is kept for the life of the log: the
    /// history may have been listed after eviction, and that snapshot is then
    /// the only record of the evicted prefix.
    pub fn from_entries(entries: Vec<Entry>, options: HistoryOptions) -> Self {
        let cleared_until = match entries.first() {
            Some(origin) if origin.has_snapshot() => 1,
            _ => 0,
        };
        Self {
            entries,
            options,
            cleared_until,
        }
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrow the entries in chronological order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Owned copy of every entry. Changing the copy does not affect the log.
    pub fn list(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    /// Append an entry and return it together with the new resolved value.
    ///
    /// Payload validation and every fold happen before the log is touched,
    /// so a failed append leaves the log exactly as it was.
    pub fn append(&mut self, data: Value, operation: Operation) -> Result<(Entry, Object)> {
        let mut entry = Entry::new(data, operation)?;

        let backfill = if self.options.retention_limit() > 0 {
            self.missing_snapshots()?
        } else {
            Vec::new()
        };

        let base = match backfill.last() {
            Some((index, value)) if index + 1 == self.entries.len() => value.clone(),
            _ => self.latest()?,
        };
        let value = fold(&base, &entry)?;

        for (index, snapshot) in backfill {
            self.entries[index].value = Some(snapshot);
        }

        if let Some(last) = self.entries.last() {
            entry.timestamp = entry.timestamp.max(last.timestamp);
        }
        entry.value = Some(value.clone());
        self.entries.push(entry.clone());

        tracing::trace!(
            operation = %operation,
            len = self.entries.len(),
            "appended entry"
        );

        self.clear_outside_window();
        self.evict();

        Ok((entry, value))
    }

    /// Resolved value at `index`.
    ///
    /// Negative indices count from the end (`-1` is the newest entry).
    /// Returns `Ok(None)` when the index is out of range.
    pub fn at(&self, index: i64) -> Result<Option<Object>> {
        match self.position(index) {
            Some(position) => self.resolve(position).map(Some),
            None => Ok(None),
        }
    }

    /// Resolved value of the newest entry (the empty object for an empty log).
    pub fn latest(&self) -> Result<Object> {
        match self.entries.len() {
            0 => Ok(Object::new()),
            len => self.resolve(len - 1),
        }
    }

    /// Cached snapshot of the newest entry.
    ///
    /// Always present once anything has been appended through
    /// [`append`](Self::append), since no policy clears the newest snapshot.
    pub fn current(&self) -> Option<&Object> {
        self.entries.last().and_then(|entry| entry.value.as_ref())
    }

    fn position(&self, index: i64) -> Option<usize> {
        let len = i64::try_from(self.entries.len()).ok()?;
        let position = if index < 0 { len + index } else { index };
        if (0..len).contains(&position) {
            usize::try_from(position).ok()
        } else {
            None
        }
    }

    /// Replay up to `position`, starting from the nearest cached snapshot at
    /// or before it, or from the empty object at the origin.
    fn resolve(&self, position: usize) -> Result<Object> {
        let cached = self.entries[..=position]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, entry)| entry.value.as_ref().map(|value| (index, value)));

        let (mut state, start) = match cached {
            Some((index, value)) if index == position => return Ok(value.clone()),
            Some((index, value)) => (value.clone(), index + 1),
            None => (Object::new(), 0),
        };

        for entry in &self.entries[start..=position] {
            state = fold(&state, entry)?;
        }
        Ok(state)
    }

    /// Snapshots for entries that lack one, computed in a single forward pass.
    fn missing_snapshots(&self) -> Result<Vec<(usize, Object)>> {
        if self.entries.iter().all(Entry::has_snapshot) {
            return Ok(Vec::new());
        }

        let mut state = Object::new();
        let mut missing = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            state = match &entry.value {
                Some(value) => value.clone(),
                None => {
                    let next = fold(&state, entry)?;
                    missing.push((index, next.clone()));
                    next
                }
            };
        }
        Ok(missing)
    }

    fn clear_outside_window(&mut self) {
        let window = self.options.snapshot_window();
        if window == 0 || self.options.retention_limit() > 0 {
            return;
        }

        let keep_from = self.entries.len().saturating_sub(window);
        if keep_from <= self.cleared_until {
            return;
        }

        for entry in &mut self.entries[self.cleared_until..keep_from] {
            entry.value = None;
        }
        tracing::trace!(
            from = self.cleared_until,
            to = keep_from,
            "cleared snapshots outside window"
        );
        self.cleared_until = keep_from;
    }

    fn evict(&mut self) {
        let limit = self.options.retention_limit();
        if limit == 0 || self.entries.len() <= limit {
            return;
        }

        let excess = self.entries.len() - limit;
        self.entries.drain(..excess);
        tracing::debug!(evicted = excess, retained = limit, "evicted oldest entries");
    }
}
