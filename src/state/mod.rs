//! State reconstruction.
//!
//! A resolved state is the fold of every entry from the start of history.
//! Cached snapshots on entries let the log skip most of that replay.

mod operations;

pub use operations::{fold, fold_all};
