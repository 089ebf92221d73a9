//! File-backed version store.
//!
//! One JSONL append-only log per project plus a sibling hint file. Appends
//! are a single serialized line (write + fsync); the hint is rewritten
//! atomically via temp + fsync + rename so a crash never leaves a partial
//! hint. A torn trailing line in the log (crash mid-append) is skipped on
//! read and truncated away by the next append.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::{Clock, NewVersion, ProjectId, Version, VersionId};

use super::{ProjectHint, StoreError, VersionStore};

/// Per-project write cursor, lazily recovered from the log on first touch.
struct Cursor {
    next_id: VersionId,
}

pub struct DiskStore {
    dir: PathBuf,
    cursors: HashMap<ProjectId, Cursor>,
    clock: Clock,
}

impl DiskStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let store = DiskStore {
            dir,
            cursors: HashMap::new(),
            clock: Clock::new(),
        };
        store.cleanup_stale()?;
        Ok(store)
    }

    /// Stable filename for a project: first 16 hex chars of SHA-256 of the
    /// id, so arbitrary id strings never leak into paths.
    fn stem(&self, project_id: &ProjectId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(project_id.as_str().as_bytes());
        let hash = hasher.finalize();
        hex::encode(&hash[..8])
    }

    fn log_path(&self, project_id: &ProjectId) -> PathBuf {
        self.dir.join(format!("{}.log", self.stem(project_id)))
    }

    fn hint_path(&self, project_id: &ProjectId) -> PathBuf {
        self.dir.join(format!("{}.hint", self.stem(project_id)))
    }

    /// Remove temp files left by a crash during a hint rewrite.
    fn cleanup_stale(&self) -> Result<(), StoreError> {
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "tmp") {
                let _ = fs::remove_file(&path);
            }
        }
        Ok(())
    }

    /// Read every intact entry of a project's log in append order.
    ///
    /// A torn final line is tolerated (crash mid-append); a torn line in the
    /// middle means real corruption and is reported.
    fn read_log(&self, project_id: &ProjectId) -> Result<Vec<Version>, StoreError> {
        let path = self.log_path(project_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)?;
        let mut entries = Vec::new();
        let lines: Vec<&str> = data.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Version>(line) {
                Ok(version) => entries.push(version),
                Err(err) if index + 1 == lines.len() => {
                    tracing::warn!(
                        project = %project_id,
                        %err,
                        "dropping torn trailing log line"
                    );
                }
                Err(err) => {
                    return Err(StoreError::Corrupt {
                        reason: format!("log line {} of {}: {err}", index + 1, path.display()),
                    });
                }
            }
        }
        Ok(entries)
    }

    fn cursor(&mut self, project_id: &ProjectId) -> Result<&mut Cursor, StoreError> {
        if !self.cursors.contains_key(project_id) {
            let entries = self.read_log(project_id)?;
            let next_id = entries
                .iter()
                .map(|v| v.id)
                .max()
                .map(VersionId::next)
                .unwrap_or(VersionId::new(1));
            // Seed the clock from the log so a backward OS-clock step
            // across restarts cannot timestamp a new append behind
            // existing entries.
            if let Some(latest) = entries.iter().map(|v| v.created_at).max() {
                self.clock.observe(latest);
            }
            self.cursors
                .insert(project_id.clone(), Cursor { next_id });
        }
        Ok(self.cursors.get_mut(project_id).expect("cursor just inserted"))
    }

    /// Whether the log's last byte is a newline. A partial trailing line
    /// (crash mid-append) must be terminated before the next entry or it
    /// would swallow that entry's JSON.
    fn log_ends_clean(path: &Path) -> Result<bool, StoreError> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(true);
        }
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }

    /// Drop a partial trailing line so the next entry starts on a clean
    /// boundary. The partial entry was never acknowledged, so nothing is
    /// lost.
    fn truncate_torn_tail(path: &Path) -> Result<(), StoreError> {
        let data = fs::read(path)?;
        let keep = data
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(keep as u64)?;
        file.sync_all()?;
        Ok(())
    }

    fn write_hint(&self, project_id: &ProjectId, hint: &ProjectHint) -> Result<(), StoreError> {
        let hint_path = self.hint_path(project_id);
        let tmp_path = hint_path.with_extension("hint.tmp");

        let data = serde_json::to_vec(hint).map_err(|err| StoreError::Corrupt {
            reason: format!("hint encode: {err}"),
        })?;

        let mut file = File::create(&tmp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &hint_path)?;

        // fsync the directory so the rename is durable
        #[cfg(unix)]
        {
            if let Ok(dir) = File::open(&self.dir) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

impl VersionStore for DiskStore {
    fn append(&mut self, new: NewVersion) -> Result<Version, StoreError> {
        // Cursor first: recovery also seeds the clock from the log.
        let cursor = self.cursor(&new.project_id)?;
        let id = cursor.next_id;
        cursor.next_id = cursor.next_id.next();
        let created_at = self.clock.tick();
        let version = Version {
            id,
            project_id: new.project_id,
            code: new.code,
            change_message: new.change_message,
            created_at,
        };

        let mut line = serde_json::to_vec(&version).map_err(|err| StoreError::Corrupt {
            reason: format!("version encode: {err}"),
        })?;
        line.push(b'\n');

        let path = self.log_path(&version.project_id);
        if path.exists() && !Self::log_ends_clean(&path)? {
            Self::truncate_torn_tail(&path)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        file.sync_all()?;

        self.write_hint(
            &version.project_id,
            &ProjectHint {
                code: version.code.clone(),
                updated_at: created_at,
            },
        )?;

        Ok(version)
    }

    fn list(&mut self, project_id: &ProjectId) -> Result<Vec<Version>, StoreError> {
        let mut entries = self.read_log(project_id)?;
        entries.sort_by(Version::display_cmp);
        Ok(entries)
    }

    fn hint(&mut self, project_id: &ProjectId) -> Result<Option<ProjectHint>, StoreError> {
        let path = self.hint_path(project_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let hint = serde_json::from_slice(&data).map_err(|err| StoreError::Corrupt {
            reason: format!("hint decode of {}: {err}", path.display()),
        })?;
        Ok(Some(hint))
    }
}

/// `Path`-based convenience used by tests.
impl DiskStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
