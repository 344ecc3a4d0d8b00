//! Error types for the query cache

use crate::key::QueryKey;

/// Query cache failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The registered fetcher failed
    #[error("fetch for {key} failed: {reason}")]
    FetchFailed {
        /// Key being fetched
        key: QueryKey,
        /// Rendered fetcher error
        reason: String,
    },

    /// The fetch was cancelled before it could store its result
    #[error("fetch for {0} was cancelled")]
    Cancelled(QueryKey),

    /// No fetcher registered for the key
    #[error("no fetcher registered for {0}")]
    NoFetcher(QueryKey),
}

impl CacheError {
    /// Check if the failure came from a cancellation rather than the store
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
