//! Store worker: owns the version store on its own thread.
//!
//! Jobs arrive over a channel and execute strictly sequentially, so even a
//! queued flush behind an in-flight append can never interleave two appends
//! for the same project. The loop drains until the job channel disconnects,
//! finishing the job in hand first - an in-flight save deliberately outlives
//! the session that requested it.

use crossbeam::channel::{Receiver, Sender};

use crate::core::{NewVersion, ProjectId, Version};
use crate::store::{StoreError, VersionStore};

#[derive(Clone, Debug)]
pub enum StoreJob {
    Append(NewVersion),
    List(ProjectId),
}

#[derive(Debug)]
pub enum StoreOutcome {
    Appended(Result<Version, StoreError>),
    Listed(Result<Vec<Version>, StoreError>),
}

pub fn run_store_loop(
    mut store: Box<dyn VersionStore>,
    job_rx: Receiver<StoreJob>,
    outcome_tx: Sender<StoreOutcome>,
) {
    while let Ok(job) = job_rx.recv() {
        let outcome = match job {
            StoreJob::Append(new) => StoreOutcome::Appended(store.append(new)),
            StoreJob::List(project_id) => StoreOutcome::Listed(store.list(&project_id)),
        };
        // Ignore send errors - the session may already be gone.
        let _ = outcome_tx.send(outcome);
    }
}
