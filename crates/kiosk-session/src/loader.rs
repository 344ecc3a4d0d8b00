//! Loading the definition a kiosk presents

use crate::error::SessionError;
use futures::FutureExt;
use kiosk_cache::{MokaQueryCache, QueryKey};
use kiosk_core::{SharedGateway, SurveyDefinition};
use std::sync::Arc;

/// Cache key for the active definition
#[must_use]
pub fn active_definition_key() -> QueryKey {
    QueryKey::new(["activeForm"])
}

/// Fetch the active definition through `cache`, registering the gateway as
/// its fetcher.
///
/// Returns `None` when nothing is active.
///
/// # Errors
/// `SessionError::Load` when the gateway or cache fails
pub async fn load_active_definition(
    cache: &MokaQueryCache<Option<SurveyDefinition>>,
    gateway: SharedGateway,
) -> Result<Option<SurveyDefinition>, SessionError> {
    let key = active_definition_key();
    cache.register_fetcher(
        key.clone(),
        Arc::new(move || {
            let gateway = Arc::clone(&gateway);
            async move { Ok::<_, anyhow::Error>(gateway.fetch_active_definition().await?) }.boxed()
        }),
    );

    match cache.fetch(&key).await {
        Ok(Some(definition)) => {
            tracing::info!(form_id = %definition.id, title = %definition.title, "active survey loaded");
            Ok(Some(definition))
        }
        Ok(None) => {
            tracing::info!("no active survey");
            Ok(None)
        }
        Err(err) => {
            tracing::warn!(error = %err, "active survey unavailable");
            Err(SessionError::Load(err.to_string()))
        }
    }
}
