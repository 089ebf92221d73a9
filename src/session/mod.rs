//! The edit session - the autosave state machine.
//!
//! Provides:
//! - `EditBuffer` - live artifact text + language tag
//! - `DebounceTimer` - single-slot cancel-and-rearm commit timer
//! - `SaveCoordinator` - at-most-one-in-flight gate over the store
//! - `HistoryView` - read projection of the version log
//! - `EditSession` - the value object tying the above together
//! - `run_session_loop` / `run_store_loop` - threaded wiring

pub mod buffer;
pub mod coordinator;
pub mod debounce;
pub mod history;
pub mod run;
pub mod session;
pub mod worker;

pub use buffer::EditBuffer;
pub use coordinator::{SaveCoordinator, SaveDecision, SaveStatus};
pub use debounce::DebounceTimer;
pub use history::{HistoryState, HistoryView};
pub use run::{SessionEvent, SessionHandle, run_session_loop, spawn_session};
pub use session::{EditSession, RestoreReceipt};
pub use worker::{StoreJob, StoreOutcome, run_store_loop};
