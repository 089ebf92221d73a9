#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod session;
pub mod store;
pub mod telemetry;

pub use error::{Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    ChangeMessage, Clock, NewVersion, ProjectId, Timestamp, Version, VersionId,
};
pub use crate::session::{
    DebounceTimer, EditBuffer, EditSession, HistoryState, HistoryView, RestoreReceipt,
    SaveCoordinator, SaveDecision, SaveStatus, SessionEvent, SessionHandle, StoreJob,
    StoreOutcome, run_session_loop, run_store_loop, spawn_session,
};
pub use crate::store::{DiskStore, MemoryStore, ProjectHint, StoreError, VersionStore};
