//! In-process store
//!
//! Backs the CLI and the test suites. Reads observe writes immediately.

use crate::error::GatewayError;
use crate::gateway::SurveyGateway;
use crate::types::{
    FormId, FormStatus, NewSurvey, ResponseId, ResponseRecord, StoredResponse, SurveyDefinition,
    SurveyPatch,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use ulid::Ulid;

#[derive(Debug, Default)]
struct Store {
    /// Insertion order is creation order
    forms: Vec<SurveyDefinition>,
    responses: Vec<StoredResponse>,
}

/// Gateway holding everything in memory
#[derive(Debug, Default)]
pub struct MemoryGateway {
    inner: RwLock<Store>,
}

impl MemoryGateway {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a definition as-is, keeping its id and status
    #[must_use]
    pub fn with_definition(self, definition: SurveyDefinition) -> Self {
        self.inner.write().forms.push(definition);
        self
    }

    /// Every stored response, oldest first
    #[must_use]
    pub fn responses(&self) -> Vec<StoredResponse> {
        self.inner.read().responses.clone()
    }

    /// Every definition, oldest first
    #[must_use]
    pub fn definitions(&self) -> Vec<SurveyDefinition> {
        self.inner.read().forms.clone()
    }
}

#[async_trait]
impl SurveyGateway for MemoryGateway {
    async fn fetch_active_definition(&self) -> Result<Option<SurveyDefinition>, GatewayError> {
        Ok(self.inner.read().forms.iter().find(|f| f.is_active()).cloned())
    }

    async fn submit_response(&self, record: ResponseRecord) -> Result<ResponseId, GatewayError> {
        let id = ResponseId::new(Ulid::new().to_string());
        tracing::debug!(form_id = %record.form_id, response_id = %id, status = ?record.status, "storing response");
        self.inner.write().responses.push(StoredResponse {
            id: id.clone(),
            record,
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    async fn list_definitions(&self) -> Result<Vec<SurveyDefinition>, GatewayError> {
        Ok(self.inner.read().forms.iter().rev().cloned().collect())
    }

    async fn fetch_definition(&self, id: &FormId) -> Result<Option<SurveyDefinition>, GatewayError> {
        Ok(self.inner.read().forms.iter().find(|f| &f.id == id).cloned())
    }

    async fn create_definition(&self, survey: NewSurvey) -> Result<FormId, GatewayError> {
        let id = FormId::new(Ulid::new().to_string());
        let definition = SurveyDefinition::from_new(id.clone(), survey, Utc::now());
        self.inner.write().forms.push(definition);
        Ok(id)
    }

    async fn update_definition(&self, id: &FormId, patch: SurveyPatch) -> Result<(), GatewayError> {
        let mut store = self.inner.write();
        let definition = store
            .forms
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.clone()))?;
        patch.apply_to(definition);
        Ok(())
    }

    async fn activate_definition(&self, id: &FormId) -> Result<(), GatewayError> {
        let mut store = self.inner.write();
        if !store.forms.iter().any(|f| &f.id == id) {
            return Err(GatewayError::NotFound(id.clone()));
        }
        for form in &mut store.forms {
            if form.is_active() && &form.id != id {
                tracing::debug!(form_id = %form.id, "demoting active survey");
                form.status = FormStatus::Draft;
            }
            if &form.id == id {
                form.status = FormStatus::Active;
            }
        }
        Ok(())
    }

    async fn delete_definition(&self, id: &FormId) -> Result<(), GatewayError> {
        self.inner.write().forms.retain(|f| &f.id != id);
        Ok(())
    }

    async fn list_responses(&self, form_id: &FormId) -> Result<Vec<StoredResponse>, GatewayError> {
        Ok(self
            .inner
            .read()
            .responses
            .iter()
            .rev()
            .filter(|r| &r.record.form_id == form_id)
            .cloned()
            .collect())
    }
}
