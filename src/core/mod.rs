//! Layer 0: domain types.
//!
//! Identity atoms, time primitives, and the version record itself.
//! Everything above (store, session) is built out of these.

pub mod error;
pub mod identity;
pub mod time;
pub mod version;

pub use error::{CoreError, InvalidId};
pub use identity::{ProjectId, VersionId};
pub use time::{Clock, Timestamp};
pub use version::{ChangeMessage, NewVersion, Version};
