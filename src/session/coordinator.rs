//! The save coordinator: the state machine gating the version store.
//!
//! Pure state, no I/O. `admit` decides whether a commit request may proceed
//! (at most one append in flight per session); `complete` returns the
//! machine to a terminal idle state whatever the outcome. Store failures are
//! non-fatal: the buffer is never rolled back, nothing retries here - the
//! next debounce cycle is the retry path.

use crate::core::{ChangeMessage, NewVersion, ProjectId, Timestamp, Version};
use crate::store::StoreError;

/// Tri-state projection for the presentation layer, plus the timestamp a
/// "Saved HH:MM:SS" indicator needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing persisted by this session yet.
    Idle,
    Saving,
    Saved { at: Timestamp },
    Failed { note: String },
}

impl SaveStatus {
    pub fn label(&self) -> String {
        match self {
            SaveStatus::Idle => "Unsaved".to_string(),
            SaveStatus::Saving => "Saving…".to_string(),
            SaveStatus::Saved { at } => format!("Saved {}", at.hms()),
            SaveStatus::Failed { note } => format!("Save failed: {note}"),
        }
    }
}

/// Outcome of `admit`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveDecision {
    /// Proceed: hand this payload to the store.
    Accepted(NewVersion),
    /// A save is outstanding. The request is dropped - no queueing, no
    /// error; the next debounce cycle re-requests with the latest buffer.
    DroppedInFlight,
    /// Content equals the last successful save and the no-op guard is on.
    SkippedUnchanged,
}

pub struct SaveCoordinator {
    project_id: ProjectId,
    save_in_flight: bool,
    last_saved_at: Option<Timestamp>,
    /// Body of the most recent successful append, for the no-op check.
    last_saved_code: Option<String>,
    last_failure: Option<String>,
    skip_unchanged: bool,
}

impl SaveCoordinator {
    pub fn new(project_id: ProjectId, skip_unchanged: bool) -> Self {
        Self {
            project_id,
            save_in_flight: false,
            last_saved_at: None,
            last_saved_code: None,
            last_failure: None,
            skip_unchanged,
        }
    }

    pub fn save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    pub fn last_saved_at(&self) -> Option<Timestamp> {
        self.last_saved_at
    }

    /// Request a save of `code`. Precondition order matters: the in-flight
    /// gate is checked before the no-op guard, so a dropped request never
    /// records a skip.
    pub fn admit(&mut self, code: &str, message: ChangeMessage) -> SaveDecision {
        if self.save_in_flight {
            tracing::debug!(project = %self.project_id, "save dropped: one already in flight");
            return SaveDecision::DroppedInFlight;
        }
        if self.skip_unchanged && self.last_saved_code.as_deref() == Some(code) {
            tracing::debug!(project = %self.project_id, "save skipped: content unchanged");
            return SaveDecision::SkippedUnchanged;
        }

        self.save_in_flight = true;
        SaveDecision::Accepted(NewVersion {
            project_id: self.project_id.clone(),
            code: code.to_string(),
            change_message: message,
        })
    }

    /// Admission for the one-shot flush at session close. Applies the
    /// no-op guard but not the in-flight gate: the flush is the session's
    /// last word and the store worker serializes appends anyway.
    pub fn admit_flush(&mut self, code: &str) -> Option<NewVersion> {
        if self.skip_unchanged && self.last_saved_code.as_deref() == Some(code) {
            tracing::debug!(project = %self.project_id, "close flush skipped: content unchanged");
            return None;
        }
        Some(NewVersion {
            project_id: self.project_id.clone(),
            code: code.to_string(),
            change_message: ChangeMessage::autosave(),
        })
    }

    /// The accepted save completed. Always reaches a terminal state:
    /// `save_in_flight` is cleared on both arms.
    pub fn complete(&mut self, outcome: &Result<Version, StoreError>) {
        self.save_in_flight = false;
        match outcome {
            Ok(version) => {
                self.last_saved_at = Some(version.created_at);
                self.last_saved_code = Some(version.code.clone());
                self.last_failure = None;
                tracing::info!(
                    project = %self.project_id,
                    version = %version.id,
                    "autosave appended"
                );
            }
            Err(err) => {
                self.last_failure = Some(err.to_string());
                tracing::warn!(
                    project = %self.project_id,
                    transience = err.transience().as_str(),
                    %err,
                    "autosave failed"
                );
            }
        }
    }

    pub fn status(&self) -> SaveStatus {
        if self.save_in_flight {
            return SaveStatus::Saving;
        }
        if let Some(note) = &self.last_failure {
            return SaveStatus::Failed { note: note.clone() };
        }
        match self.last_saved_at {
            Some(at) => SaveStatus::Saved { at },
            None => SaveStatus::Idle,
        }
    }
}
