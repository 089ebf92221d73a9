//! Threaded wiring: the session loop and its store worker.
//!
//! Two threads, two channels. The session loop owns all session state and
//! uses `crossbeam::select!` over UI events and store outcomes, waking at
//! the debounce deadline to dispatch commits. The worker (`worker.rs`) owns
//! the store. Closing the session cancels the pending timer and returns
//! without draining outcomes; the worker finishes whatever is in flight.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender, unbounded};

use crate::core::Version;
use crate::store::VersionStore;

use super::coordinator::SaveStatus;
use super::session::{EditSession, RestoreReceipt};
use super::worker::{StoreJob, StoreOutcome, run_store_loop};

/// Wake-up period while no commit is pending.
const IDLE_PARK: Duration = Duration::from_secs(60);

pub enum SessionEvent {
    SetCode(String),
    SetLanguage(String),
    Restore {
        version: Version,
        respond: Sender<RestoreReceipt>,
    },
    RefreshHistory,
    QueryStatus {
        respond: Sender<SaveStatus>,
    },
    Close,
}

/// Drive a session until `Close` (or until every event sender is dropped).
///
/// Returns the session so callers can inspect its final state.
pub fn run_session_loop(
    mut session: EditSession,
    event_rx: Receiver<SessionEvent>,
    job_tx: Sender<StoreJob>,
    outcome_rx: Receiver<StoreOutcome>,
) -> EditSession {
    loop {
        let now = Instant::now();
        if let Some(job) = session.fire_due_at(now) {
            let _ = job_tx.send(job);
        }
        let timeout = session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(IDLE_PARK);

        crossbeam::select! {
            recv(event_rx) -> msg => {
                match msg {
                    Ok(SessionEvent::SetCode(text)) => {
                        session.set_code_at(text, Instant::now());
                    }
                    Ok(SessionEvent::SetLanguage(tag)) => {
                        session.set_language(tag);
                    }
                    Ok(SessionEvent::Restore { version, respond }) => {
                        let receipt = session.restore_at(&version, Instant::now());
                        let _ = respond.send(receipt);
                    }
                    Ok(SessionEvent::RefreshHistory) => {
                        let _ = job_tx.send(session.begin_history_refresh());
                    }
                    Ok(SessionEvent::QueryStatus { respond }) => {
                        let _ = respond.send(session.status());
                    }
                    Ok(SessionEvent::Close) | Err(_) => {
                        if let Some(job) = session.close() {
                            let _ = job_tx.send(job);
                        }
                        return session;
                    }
                }
            }
            recv(outcome_rx) -> msg => {
                match msg {
                    Ok(outcome) => session.handle_outcome_at(outcome, Instant::now()),
                    Err(_) => {
                        // Worker gone while we still hold the job sender:
                        // it panicked. Persistence is unreachable; stop.
                        tracing::warn!("store worker disappeared, closing session");
                        session.close();
                        return session;
                    }
                }
            }
            default(timeout) => {}
        }
    }
}

/// Running session plus its thread handles.
pub struct SessionHandle {
    pub events: Sender<SessionEvent>,
    pub session: JoinHandle<EditSession>,
    pub worker: JoinHandle<()>,
}

impl SessionHandle {
    /// Signal `Close` and wait for the session thread (not the worker: an
    /// in-flight save may legitimately outlive the session).
    pub fn close(self) -> EditSession {
        let _ = self.events.send(SessionEvent::Close);
        self.session.join().expect("session thread panicked")
    }
}

/// Spawn the worker and session threads, fully wired.
pub fn spawn_session(session: EditSession, store: Box<dyn VersionStore>) -> SessionHandle {
    let (event_tx, event_rx) = unbounded();
    let (job_tx, job_rx) = unbounded();
    let (outcome_tx, outcome_rx) = unbounded();

    let worker = std::thread::spawn(move || run_store_loop(store, job_rx, outcome_tx));
    let session =
        std::thread::spawn(move || run_session_loop(session, event_rx, job_tx, outcome_rx));

    SessionHandle {
        events: event_tx,
        session,
        worker,
    }
}
