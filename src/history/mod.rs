//! History module for tracking already-downloaded files
//!
//! The history is a set of canonical URL identifiers persisted as JSON, together with
//! where each file was placed. It is loaded once at startup and rewritten atomically
//! after every successful download, so an interrupted run never loses or truncates
//! previously recorded entries.

mod store;

pub use store::HistoryStore;

use crate::HistoryError;
use std::path::Path;

/// What to do when the history file exists but cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptHistoryPolicy {
    /// Refuse to run; continuing would re-download everything
    #[default]
    Abort,
    /// Log a warning and continue with an empty history
    StartEmpty,
}

/// Loads the history store, applying the given policy to corrupt files
///
/// I/O failures other than a missing file are always returned as errors.
pub fn load_history(
    path: &Path,
    policy: CorruptHistoryPolicy,
) -> Result<HistoryStore, HistoryError> {
    match HistoryStore::load(path) {
        Ok(store) => Ok(store),
        Err(HistoryError::Corrupt { path, source }) if policy == CorruptHistoryPolicy::StartEmpty => {
            tracing::warn!(
                "History file {} is corrupt ({}); continuing with an empty history",
                path.display(),
                source
            );
            Ok(HistoryStore::empty(path))
        }
        Err(e) => Err(e),
    }
}
