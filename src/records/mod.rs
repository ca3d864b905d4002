//! Entry log implementation.
//!
//! Entries are stored in an append-only log; each may carry a cached
//! snapshot of the resolved value so that lookups by index avoid replay.

mod log;

pub use log::EntryLog;
