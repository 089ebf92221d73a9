//! The Version Store: a durable append-only log keyed by project.
//!
//! The store is the only durable surface of the subsystem. Entries are only
//! ever added; nothing here mutates or deletes a version. The newest entry
//! IS the current state of the project - the "current code" hint is an
//! optimization for session startup, never authoritative.

pub mod disk;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{NewVersion, ProjectId, Timestamp, Version};
use crate::error::Transience;

/// Latest known body and its timestamp, read once at session start.
///
/// A cache over the newest version entry. If the two disagree, the version
/// entry wins (`resolve_initial_code`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHint {
    pub code: String,
    pub updated_at: Timestamp,
}

/// Store failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing medium refused us; retry may help.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record failed to decode. Retry will not help.
    #[error("corrupt store record: {reason}")]
    Corrupt { reason: String },
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::Unavailable { .. } => Transience::Retryable,
            StoreError::Io(_) => Transience::Retryable,
            StoreError::Corrupt { .. } => Transience::Permanent,
        }
    }
}

/// Append-only version log plus the current-code side channel.
///
/// `Send` so implementations can move onto the store worker thread.
pub trait VersionStore: Send {
    /// Append a snapshot. Assigns the next id and timestamp for the project,
    /// updates the current-code hint, and returns the created version -
    /// a never-previously-existing entry that becomes the newest.
    fn append(&mut self, new: NewVersion) -> Result<Version, StoreError>;

    /// Full log for a project, newest first (`created_at` desc, id
    /// tie-break). An unknown or empty project yields an empty vec - that is
    /// a normal state, not an error.
    fn list(&mut self, project_id: &ProjectId) -> Result<Vec<Version>, StoreError>;

    /// Current-code hint, if the project has ever been saved.
    fn hint(&mut self, project_id: &ProjectId) -> Result<Option<ProjectHint>, StoreError>;
}

/// Seed code for a fresh session: the newest version entry wins over the
/// hint whenever both exist, since the hint is only a cache of it.
pub fn resolve_initial_code(hint: Option<ProjectHint>, newest: Option<&Version>) -> Option<String> {
    match (newest, hint) {
        (Some(version), _) => Some(version.code.clone()),
        (None, Some(hint)) => Some(hint.code),
        (None, None) => None,
    }
}

pub use disk::DiskStore;
pub use memory::MemoryStore;
