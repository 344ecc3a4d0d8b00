//! Remote store contract
//!
//! The store is eventually observable: a write is not guaranteed to be visible
//! to the next read unless the caller invalidates and refetches.

use crate::error::GatewayError;
use crate::types::{
    FormId, NewSurvey, ResponseId, ResponseRecord, StoredResponse, SurveyDefinition, SurveyPatch,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Read/write access to survey definitions and responses
#[async_trait]
pub trait SurveyGateway: Send + Sync {
    /// The definition currently marked active, if any
    async fn fetch_active_definition(&self) -> Result<Option<SurveyDefinition>, GatewayError>;

    /// Store a response; the store assigns id and timestamp.
    ///
    /// Safe to retry at the caller's discretion.
    async fn submit_response(&self, record: ResponseRecord) -> Result<ResponseId, GatewayError>;

    /// All definitions, newest first
    async fn list_definitions(&self) -> Result<Vec<SurveyDefinition>, GatewayError>;

    /// One definition by id
    async fn fetch_definition(&self, id: &FormId) -> Result<Option<SurveyDefinition>, GatewayError>;

    /// Create a draft definition
    async fn create_definition(&self, survey: NewSurvey) -> Result<FormId, GatewayError>;

    /// Apply a partial update
    async fn update_definition(&self, id: &FormId, patch: SurveyPatch) -> Result<(), GatewayError>;

    /// Demote every active definition to draft, then activate `id`
    async fn activate_definition(&self, id: &FormId) -> Result<(), GatewayError>;

    /// Remove a definition; removing a missing id succeeds
    async fn delete_definition(&self, id: &FormId) -> Result<(), GatewayError>;

    /// Responses for one definition, newest first
    async fn list_responses(&self, form_id: &FormId) -> Result<Vec<StoredResponse>, GatewayError>;
}

/// Shared gateway handle
pub type SharedGateway = Arc<dyn SurveyGateway>;
