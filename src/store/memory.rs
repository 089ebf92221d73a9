//! In-memory version store.
//!
//! Backs tests and single-process embeddings. Same contract as the disk
//! store: append-only per-project logs, newest-first listing, hint kept in
//! sync with the newest entry.

use std::collections::BTreeMap;

use crate::core::{Clock, NewVersion, ProjectId, Version, VersionId};

use super::{ProjectHint, StoreError, VersionStore};

struct ProjectLog {
    /// Append order; display order is derived on read.
    entries: Vec<Version>,
    next_id: VersionId,
    hint: ProjectHint,
}

/// BTreeMap-backed store with a monotonic clock for `created_at`.
#[derive(Default)]
pub struct MemoryStore {
    projects: BTreeMap<ProjectId, ProjectLog>,
    clock: Clock,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across all projects, for assertions.
    pub fn len(&self) -> usize {
        self.projects.values().map(|log| log.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VersionStore for MemoryStore {
    fn append(&mut self, new: NewVersion) -> Result<Version, StoreError> {
        let created_at = self.clock.tick();
        let log = self
            .projects
            .entry(new.project_id.clone())
            .or_insert_with(|| ProjectLog {
                entries: Vec::new(),
                next_id: VersionId::new(1),
                hint: ProjectHint {
                    code: String::new(),
                    updated_at: created_at,
                },
            });

        let version = Version {
            id: log.next_id,
            project_id: new.project_id,
            code: new.code,
            change_message: new.change_message,
            created_at,
        };
        log.next_id = log.next_id.next();
        log.hint = ProjectHint {
            code: version.code.clone(),
            updated_at: created_at,
        };
        log.entries.push(version.clone());
        Ok(version)
    }

    fn list(&mut self, project_id: &ProjectId) -> Result<Vec<Version>, StoreError> {
        let mut entries = self
            .projects
            .get(project_id)
            .map(|log| log.entries.clone())
            .unwrap_or_default();
        entries.sort_by(Version::display_cmp);
        Ok(entries)
    }

    fn hint(&mut self, project_id: &ProjectId) -> Result<Option<ProjectHint>, StoreError> {
        Ok(self.projects.get(project_id).map(|log| log.hint.clone()))
    }
}
