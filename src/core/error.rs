use thiserror::Error;

use crate::error::Transience;

/// Identity parse/validation failures.
#[derive(Debug, Error)]
pub enum InvalidId {
    #[error("invalid project id {raw:?}: {reason}")]
    Project { raw: String, reason: String },
}

/// Errors from the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        match self {
            // Bad identity never fixes itself on retry.
            CoreError::InvalidId(_) => Transience::Permanent,
        }
    }
}
