//! Session errors

use thiserror::Error;

/// Errors reported to callers driving a session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session task has stopped
    #[error("session closed")]
    Closed,

    /// Loading the active definition failed
    #[error("failed to load active survey: {0}")]
    Load(String),
}

impl SessionError {
    /// Whether a later attempt might succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Load(_))
    }
}
