//! Admin errors

use kiosk_cache::CacheError;
use kiosk_core::{DefinitionError, GatewayError};

/// Failures surfaced to the admin surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// Store call failed; the cache has already been rolled back
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Survey failed authoring validation and was not sent
    #[error("invalid survey: {0}")]
    Invalid(#[from] DefinitionError),

    /// Cached read failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl AdminError {
    /// Check if the operation may succeed when retried
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(err) => err.is_retryable(),
            Self::Invalid(_) => false,
            Self::Cache(err) => !matches!(err, CacheError::NoFetcher(_)),
        }
    }
}
