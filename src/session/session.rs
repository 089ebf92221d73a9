//! The edit session: one value object owning the buffer, the debounce
//! timer, the save coordinator, and the history view.
//!
//! All mutation goes through explicit methods taking an injected `Instant`,
//! so the whole autosave state machine is testable without threads or
//! sleeps. The threaded wiring lives in `run.rs`.

use std::time::Instant;

use crate::config::Config;
use crate::core::{ChangeMessage, ProjectId, Timestamp, Version};
use crate::store::{StoreError, VersionStore, resolve_initial_code};

use super::buffer::EditBuffer;
use super::coordinator::{SaveCoordinator, SaveDecision, SaveStatus};
use super::debounce::DebounceTimer;
use super::history::HistoryView;
use super::worker::{StoreJob, StoreOutcome};

/// User-facing confirmation of a restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoreReceipt {
    /// When the restored version was originally saved.
    pub restored_from: Timestamp,
}

impl RestoreReceipt {
    pub fn message(&self) -> String {
        format!(
            "Code restored from version saved at {}",
            self.restored_from.hms()
        )
    }
}

pub struct EditSession {
    project_id: ProjectId,
    buffer: EditBuffer,
    timer: DebounceTimer,
    coordinator: SaveCoordinator,
    history: HistoryView,
    flush_on_close: bool,
    /// Buffer content not yet covered by an accepted save request.
    dirty: bool,
    closed: bool,
}

impl EditSession {
    pub fn new(
        project_id: ProjectId,
        initial_code: impl Into<String>,
        language: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            coordinator: SaveCoordinator::new(project_id.clone(), config.skip_unchanged),
            project_id,
            buffer: EditBuffer::new(initial_code, language),
            timer: DebounceTimer::new(config.debounce()),
            history: HistoryView::new(config.history_limit),
            flush_on_close: config.flush_on_close,
            dirty: false,
            closed: false,
        }
    }

    /// Open a session seeded from the store: the current-code hint is used
    /// only when no version exists; otherwise the newest version wins.
    pub fn open(
        project_id: ProjectId,
        store: &mut dyn VersionStore,
        language: impl Into<String>,
        config: &Config,
    ) -> Result<Self, StoreError> {
        let hint = store.hint(&project_id)?;
        let versions = store.list(&project_id)?;
        let initial = resolve_initial_code(hint, versions.first()).unwrap_or_default();
        Ok(Self::new(project_id, initial, language, config))
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    pub fn status(&self) -> SaveStatus {
        self.coordinator.status()
    }

    /// The user typed (or pasted, or restored). Rearms the debounce timer
    /// unconditionally - identical content included.
    pub fn set_code_at(&mut self, text: impl Into<String>, now: Instant) {
        self.buffer.set_code(text);
        self.dirty = true;
        self.timer.on_change_at(now);
        tracing::debug!(project = %self.project_id, "change recorded, timer rearmed");
    }

    pub fn set_language(&mut self, tag: impl Into<String>) {
        self.buffer.set_language(tag);
    }

    /// Overwrite the buffer with a historical version - through the same
    /// path as typing, so the restored state re-enters the autosave
    /// pipeline and is appended as a new tip version (labelled "autosave")
    /// after the next quiet period. Never touches the store directly.
    pub fn restore_at(&mut self, version: &Version, now: Instant) -> RestoreReceipt {
        self.set_code_at(version.code.clone(), now);
        tracing::info!(
            project = %self.project_id,
            version = %version.id,
            "restored version into buffer"
        );
        RestoreReceipt {
            restored_from: version.created_at,
        }
    }

    /// When the session loop must next wake up.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Poll the timer; on fire, run the commit request through the
    /// coordinator's gate. Returns the store job to dispatch, if any.
    pub fn fire_due_at(&mut self, now: Instant) -> Option<StoreJob> {
        if !self.timer.fire_due(now) {
            return None;
        }
        match self
            .coordinator
            .admit(self.buffer.code(), ChangeMessage::autosave())
        {
            SaveDecision::Accepted(new) => {
                self.dirty = false;
                Some(StoreJob::Append(new))
            }
            // Dropped: stay dirty; a follow-up commit is armed when the
            // in-flight save completes.
            SaveDecision::DroppedInFlight => None,
            SaveDecision::SkippedUnchanged => {
                self.dirty = false;
                None
            }
        }
    }

    /// Kick off a history refresh (initial mount or manual).
    pub fn begin_history_refresh(&mut self) -> StoreJob {
        self.history.begin_refresh();
        StoreJob::List(self.project_id.clone())
    }

    /// A store outcome arrived from the worker.
    pub fn handle_outcome_at(&mut self, outcome: StoreOutcome, now: Instant) {
        match outcome {
            StoreOutcome::Appended(result) => {
                self.coordinator.complete(&result);
                // Edits landed while the save was in flight: arm a follow-up
                // commit so their persistence is not tied to further typing.
                if self.dirty && !self.timer.is_armed() && !self.closed {
                    self.timer.on_change_at(now);
                }
            }
            StoreOutcome::Listed(result) => self.history.complete(result),
        }
    }

    /// Teardown: cancel the pending timer (an in-flight save is left to
    /// complete in the background). With `flush_on_close`, pending changes
    /// are committed once more so a restore immediately followed by
    /// navigation is not lost; the returned job must still be dispatched.
    pub fn close(&mut self) -> Option<StoreJob> {
        self.closed = true;
        self.timer.cancel();
        if self.flush_on_close && self.dirty {
            self.dirty = false;
            // The no-op guard still applies; only the in-flight gate is
            // bypassed (the worker executes jobs sequentially, so two
            // appends cannot interleave).
            if let Some(new) = self.coordinator.admit_flush(self.buffer.code()) {
                tracing::info!(project = %self.project_id, "flushing pending changes on close");
                return Some(StoreJob::Append(new));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::{NewVersion, VersionId};
    use crate::store::MemoryStore;

    const QUIET: Duration = Duration::from_millis(2000);

    fn config() -> Config {
        Config::default()
    }

    fn project(s: &str) -> ProjectId {
        ProjectId::new(s).unwrap()
    }

    /// Run an accepted job against the store and feed the outcome back.
    fn dispatch(session: &mut EditSession, store: &mut MemoryStore, job: StoreJob, now: Instant) {
        let outcome = match job {
            StoreJob::Append(new) => StoreOutcome::Appended(store.append(new)),
            StoreJob::List(id) => StoreOutcome::Listed(store.list(&id)),
        };
        session.handle_outcome_at(outcome, now);
    }

    #[test]
    fn rapid_edits_commit_once_with_last_content() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        let mut session = EditSession::new(project("p1"), "a", "javascript", &config());

        // User types to "abc" within 500ms.
        session.set_code_at("ab", base + Duration::from_millis(200));
        session.set_code_at("abc", base + Duration::from_millis(500));

        // Nothing fires during the burst or before the quiet period ends.
        assert!(session.fire_due_at(base + Duration::from_millis(600)).is_none());
        assert!(
            session
                .fire_due_at(base + Duration::from_millis(500) + QUIET - Duration::from_millis(1))
                .is_none()
        );

        // Quiet period elapsed: exactly one commit, with the last content.
        let fire_at = base + Duration::from_millis(500) + QUIET;
        let job = session.fire_due_at(fire_at).expect("commit fires");
        dispatch(&mut session, &mut store, job, fire_at);
        assert!(session.fire_due_at(fire_at + QUIET).is_none());

        let log = store.list(&project("p1")).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].code, "abc");
        assert_eq!(log[0].change_message.as_str(), "autosave");
    }

    #[test]
    fn dropped_request_commits_after_in_flight_completes() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        let mut session = EditSession::new(project("p1"), "", "rust", &config());

        session.set_code_at("v1", base);
        let first = session.fire_due_at(base + QUIET).expect("first commit");

        // Edit while the first save is in flight, and let its timer fire:
        // the request is dropped, not queued.
        session.set_code_at("v2", base + QUIET + Duration::from_millis(100));
        let second_deadline = base + QUIET + Duration::from_millis(100) + QUIET;
        assert!(session.fire_due_at(second_deadline).is_none());
        assert_eq!(session.status(), SaveStatus::Saving);

        // First save completes; a follow-up is armed for the dirty buffer.
        let done_at = second_deadline + Duration::from_millis(50);
        dispatch(&mut session, &mut store, first, done_at);
        let follow_up = session
            .next_deadline()
            .expect("follow-up armed after completion");
        let job = session.fire_due_at(follow_up).expect("follow-up commits");
        dispatch(&mut session, &mut store, job, follow_up);

        let log = store.list(&project("p1")).unwrap();
        let codes: Vec<&str> = log.iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["v2", "v1"]);
    }

    #[test]
    fn restore_reenters_autosave_pipeline() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        for code in ["x", "y", "z"] {
            store
                .append(NewVersion::autosave(project("p1"), code))
                .unwrap();
        }
        let mut session = EditSession::new(project("p1"), "z", "javascript", &config());

        let history = store.list(&project("p1")).unwrap();
        let v1 = history.last().unwrap().clone();
        assert_eq!(v1.code, "x");

        let receipt = session.restore_at(&v1, base);
        assert_eq!(receipt.restored_from, v1.created_at);
        assert_eq!(session.buffer().code(), "x");

        // History is untouched until the debounce commit lands.
        assert_eq!(store.list(&project("p1")).unwrap().len(), 3);

        let job = session.fire_due_at(base + QUIET).expect("restore commits");
        dispatch(&mut session, &mut store, job, base + QUIET);

        let after = store.list(&project("p1")).unwrap();
        assert_eq!(after.len(), 4);
        assert_eq!(after[0].code, "x");
        assert_eq!(after[0].id, VersionId::new(4));
        assert_eq!(after[0].change_message.as_str(), "autosave");
        // Existing entries unchanged, same relative order.
        assert_eq!(after[1..], history[..]);
    }

    #[test]
    fn restore_then_edit_persists_only_the_edit() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        let old = store
            .append(NewVersion::autosave(project("p1"), "old"))
            .unwrap();
        let mut session = EditSession::new(project("p1"), "current", "rust", &config());

        session.restore_at(&old, base);
        session.set_code_at("old but edited", base + Duration::from_millis(300));

        let fire_at = base + Duration::from_millis(300) + QUIET;
        let job = session.fire_due_at(fire_at).expect("one commit");
        dispatch(&mut session, &mut store, job, fire_at);

        let log = store.list(&project("p1")).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].code, "old but edited");
    }

    #[test]
    fn open_prefers_newest_version_over_hint() {
        let mut store = MemoryStore::new();
        store
            .append(NewVersion::autosave(project("p1"), "newest"))
            .unwrap();
        let session =
            EditSession::open(project("p1"), &mut store, "javascript", &config()).unwrap();
        assert_eq!(session.buffer().code(), "newest");

        let empty = EditSession::open(project("fresh"), &mut store, "javascript", &config());
        assert_eq!(empty.unwrap().buffer().code(), "");
    }

    #[test]
    fn close_cancels_timer_and_flushes_pending_changes() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        let mut session = EditSession::new(project("p1"), "", "rust", &config());

        session.set_code_at("unsaved", base);
        let job = session.close().expect("flush job");
        assert!(session.next_deadline().is_none());

        let now = base + Duration::from_millis(1);
        dispatch(&mut session, &mut store, job, now);
        let log = store.list(&project("p1")).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].code, "unsaved");
    }

    #[test]
    fn close_without_flush_policy_drops_pending_changes() {
        let base = Instant::now();
        let mut cfg = config();
        cfg.flush_on_close = false;
        let mut session = EditSession::new(project("p1"), "", "rust", &cfg);

        session.set_code_at("unsaved", base);
        assert!(session.close().is_none());
        assert!(session.next_deadline().is_none());
    }

    #[test]
    fn clean_close_has_nothing_to_flush() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        let mut session = EditSession::new(project("p1"), "", "rust", &config());

        session.set_code_at("saved", base);
        let job = session.fire_due_at(base + QUIET).unwrap();
        dispatch(&mut session, &mut store, job, base + QUIET);

        assert!(session.close().is_none());
    }

    #[test]
    fn close_flush_skips_unchanged_content_under_the_guard() {
        let base = Instant::now();
        let mut cfg = config();
        cfg.skip_unchanged = true;
        let mut store = MemoryStore::new();
        let mut session = EditSession::new(project("p1"), "", "rust", &cfg);

        session.set_code_at("same", base);
        let job = session.fire_due_at(base + QUIET).unwrap();
        dispatch(&mut session, &mut store, job, base + QUIET);

        // An identical-content change rearms the timer and marks the
        // session dirty, but the guard covers the close flush too.
        session.set_code_at("same", base + QUIET * 2);
        assert!(session.close().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn no_follow_up_after_close() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        let mut session = EditSession::new(project("p1"), "", "rust", &config());

        session.set_code_at("v1", base);
        let first = session.fire_due_at(base + QUIET).unwrap();
        session.set_code_at("v2", base + QUIET + Duration::from_millis(10));
        let flush = session.close().expect("flush covers v2");

        // In-flight outcome arriving after close must not rearm the timer.
        dispatch(&mut session, &mut store, first, base + QUIET * 2);
        assert!(session.next_deadline().is_none());

        dispatch(&mut session, &mut store, flush, base + QUIET * 2);
        let codes: Vec<String> = store
            .list(&project("p1"))
            .unwrap()
            .iter()
            .map(|v| v.code.clone())
            .collect();
        assert_eq!(codes, vec!["v2".to_string(), "v1".to_string()]);
    }

    #[test]
    fn history_refresh_updates_view() {
        let base = Instant::now();
        let mut store = MemoryStore::new();
        store
            .append(NewVersion::autosave(project("p1"), "a"))
            .unwrap();
        let mut session = EditSession::new(project("p1"), "a", "rust", &config());

        let job = session.begin_history_refresh();
        assert!(session.history().is_loading());
        dispatch(&mut session, &mut store, job, base);

        assert_eq!(session.history().entries().len(), 1);
    }
}
