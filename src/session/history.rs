//! History view: read-only projection of the version log.
//!
//! Lifecycle: `idle -> loading -> { loaded | load_failed }`, re-entrant on
//! manual refresh. A fetch failure keeps the previously loaded entries
//! visible and is retryable; an empty log is a normal loaded state.

use crate::core::Version;
use crate::store::StoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    Loading,
    Loaded,
    LoadFailed { note: String },
}

pub struct HistoryView {
    state: HistoryState,
    entries: Vec<Version>,
    limit: usize,
}

impl HistoryView {
    pub fn new(limit: usize) -> Self {
        Self {
            state: HistoryState::Idle,
            entries: Vec::new(),
            limit,
        }
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    /// Newest first, truncated to the configured limit.
    pub fn entries(&self) -> &[Version] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.state == HistoryState::Loading
    }

    pub fn begin_refresh(&mut self) {
        self.state = HistoryState::Loading;
    }

    pub fn complete(&mut self, result: Result<Vec<Version>, StoreError>) {
        match result {
            Ok(mut versions) => {
                versions.sort_by(Version::display_cmp);
                versions.truncate(self.limit);
                self.entries = versions;
                self.state = HistoryState::Loaded;
            }
            Err(err) => {
                tracing::warn!(%err, "history refresh failed");
                // Keep whatever was last loaded; only the state changes.
                self.state = HistoryState::LoadFailed {
                    note: err.to_string(),
                };
            }
        }
    }
}
