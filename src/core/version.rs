//! The version record: one immutable snapshot of the artifact.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::identity::{ProjectId, VersionId};
use super::time::Timestamp;

/// Free-text provenance label for a version.
///
/// Defaults to "autosave" - the label every debounce-triggered commit
/// carries, including the commit that follows a restore.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeMessage(String);

impl ChangeMessage {
    pub const AUTOSAVE: &'static str = "autosave";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn autosave() -> Self {
        Self(Self::AUTOSAVE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChangeMessage {
    fn default() -> Self {
        Self::autosave()
    }
}

impl fmt::Debug for ChangeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeMessage({:?})", self.0)
    }
}

impl fmt::Display for ChangeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable point-in-time state of the artifact.
///
/// Created only by a successful store append; never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub project_id: ProjectId,
    /// Full body text - no diffing, every version is self-contained.
    pub code: String,
    pub change_message: ChangeMessage,
    pub created_at: Timestamp,
}

impl Version {
    /// Display order: newest first by `created_at`, version id as the
    /// tie-break for equal timestamps.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Payload for a store append. The store assigns id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVersion {
    pub project_id: ProjectId,
    pub code: String,
    pub change_message: ChangeMessage,
}

impl NewVersion {
    pub fn autosave(project_id: ProjectId, code: impl Into<String>) -> Self {
        Self {
            project_id,
            code: code.into(),
            change_message: ChangeMessage::autosave(),
        }
    }
}
