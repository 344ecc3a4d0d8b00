//! Admin console
//!
//! Reads go through the query cache; writes go through the optimistic
//! mutations in [`crate::mutations`], so the definition list reflects an edit
//! before the store confirms it and snaps back if the store refuses.

use crate::error::AdminError;
use crate::mutations::{
    self, form_key, forms_key, ActivateMutation, CreateMutation, DeleteMutation, FormsCache,
    UpdateMutation,
};
use crate::results::SurveyResults;
use futures::FutureExt;
use kiosk_cache::{responses_key, MokaQueryCache, QueryCache};
use kiosk_core::{
    CacheConfig, FormId, FormStatus, NewSurvey, SharedGateway, StoredResponse, SurveyDefinition,
    SurveyPatch,
};
use std::sync::Arc;

/// Authoring and reporting operations over one store
pub struct AdminConsole {
    gateway: SharedGateway,
    forms: Arc<MokaQueryCache<Vec<SurveyDefinition>>>,
    form: Arc<MokaQueryCache<Option<SurveyDefinition>>>,
    responses: Arc<MokaQueryCache<Vec<StoredResponse>>>,
    update: UpdateMutation,
    activate: ActivateMutation,
    delete: DeleteMutation,
    create: CreateMutation,
}

impl std::fmt::Debug for AdminConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole")
            .field("forms", &self.forms)
            .field("form", &self.form)
            .field("responses", &self.responses)
            .finish_non_exhaustive()
    }
}

impl AdminConsole {
    /// Create a console with fresh caches sized by `config`
    #[must_use]
    pub fn new(gateway: SharedGateway, config: &CacheConfig) -> Self {
        let forms = Arc::new(MokaQueryCache::new(config.max_capacity));
        let list_gateway = Arc::clone(&gateway);
        forms.register_fetcher(
            forms_key(),
            Arc::new(move || {
                let gateway = Arc::clone(&list_gateway);
                async move { Ok::<_, anyhow::Error>(gateway.list_definitions().await?) }.boxed()
            }),
        );

        let shared: FormsCache = forms.clone();
        let settle = config.invalidate_on_settled;
        Self {
            update: mutations::update(Arc::clone(&gateway), Arc::clone(&shared))
                .invalidate_on_settled(settle),
            activate: mutations::activate(Arc::clone(&gateway), Arc::clone(&shared))
                .invalidate_on_settled(settle),
            delete: mutations::delete(Arc::clone(&gateway), Arc::clone(&shared))
                .invalidate_on_settled(settle),
            create: mutations::create(Arc::clone(&gateway), shared).invalidate_on_settled(settle),
            form: Arc::new(MokaQueryCache::new(config.max_capacity)),
            responses: Arc::new(MokaQueryCache::new(config.max_capacity)),
            forms,
            gateway,
        }
    }

    /// Cache holding the definition list
    #[inline]
    #[must_use]
    pub fn forms_cache(&self) -> &Arc<MokaQueryCache<Vec<SurveyDefinition>>> {
        &self.forms
    }

    /// All definitions, newest first
    ///
    /// # Errors
    /// `AdminError::Cache` if the list cannot be loaded
    pub async fn forms(&self) -> Result<Vec<SurveyDefinition>, AdminError> {
        Ok(self.forms.fetch(&forms_key()).await?)
    }

    /// One definition, `None` if it does not exist
    ///
    /// # Errors
    /// `AdminError::Cache` if the store cannot be reached
    pub async fn form(&self, id: &FormId) -> Result<Option<SurveyDefinition>, AdminError> {
        let key = form_key(id);
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.form.register_fetcher(
            key.clone(),
            Arc::new(move || {
                let gateway = Arc::clone(&gateway);
                let target = target.clone();
                async move { Ok::<_, anyhow::Error>(gateway.fetch_definition(&target).await?) }
                    .boxed()
            }),
        );
        Ok(self.form.fetch(&key).await?)
    }

    /// Stored responses of a definition, newest first
    ///
    /// # Errors
    /// `AdminError::Cache` if the store cannot be reached
    pub async fn responses(&self, id: &FormId) -> Result<Vec<StoredResponse>, AdminError> {
        let key = responses_key(id);
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.responses.register_fetcher(
            key.clone(),
            Arc::new(move || {
                let gateway = Arc::clone(&gateway);
                let target = target.clone();
                async move { Ok::<_, anyhow::Error>(gateway.list_responses(&target).await?) }
                    .boxed()
            }),
        );
        Ok(self.responses.fetch(&key).await?)
    }

    /// Aggregate results, `None` if the definition does not exist
    ///
    /// # Errors
    /// `AdminError::Cache` if the store cannot be reached
    pub async fn results(&self, id: &FormId) -> Result<Option<SurveyResults>, AdminError> {
        let Some(definition) = self.form(id).await? else {
            return Ok(None);
        };
        let responses = self.responses(id).await?;
        Ok(Some(SurveyResults::compute(&definition, &responses)))
    }

    /// Validate and create a draft definition
    ///
    /// # Errors
    /// - `AdminError::Invalid` before anything is sent
    /// - `AdminError::Gateway` if the store refuses
    pub async fn create(&self, survey: NewSurvey) -> Result<FormId, AdminError> {
        survey.validate()?;
        let title = survey.title.clone();
        let id = self.create.run(survey).await?;
        tracing::info!(form_id = %id, %title, "survey created");
        Ok(id)
    }

    /// Patch a definition; edits to title or questions are validated first
    ///
    /// Setting the status to active goes through [`AdminConsole::activate`]
    /// after the other fields, so at most one definition stays active.
    ///
    /// # Errors
    /// - `AdminError::Invalid` if the patched definition breaks authoring rules
    /// - `AdminError::Gateway` if the store refuses; the cached list is rolled back
    pub async fn update(&self, id: &FormId, mut patch: SurveyPatch) -> Result<(), AdminError> {
        if patch.title.is_some() || patch.questions.is_some() {
            if let Some(mut current) = self.form(id).await? {
                patch.apply_to(&mut current);
                current.validate()?;
            }
        }

        let activating = patch.status == Some(FormStatus::Active);
        if activating {
            patch.status = None;
        }
        if !patch.is_empty() {
            self.update.run((id.clone(), patch)).await?;
            self.refresh_form(id).await;
            tracing::info!(form_id = %id, "survey updated");
        }
        if activating {
            self.activate(id).await?;
        }
        Ok(())
    }

    /// Change only the status; `Active` is an activation
    ///
    /// # Errors
    /// `AdminError::Gateway` if the store refuses; the cached list is rolled back
    pub async fn set_status(&self, id: &FormId, status: FormStatus) -> Result<(), AdminError> {
        if status == FormStatus::Active {
            return self.activate(id).await;
        }
        self.update.run((id.clone(), SurveyPatch::status(status))).await?;
        self.refresh_form(id).await;
        tracing::info!(form_id = %id, %status, "status changed");
        Ok(())
    }

    /// Retire a definition
    ///
    /// # Errors
    /// `AdminError::Gateway` if the store refuses; the cached list is rolled back
    pub async fn archive(&self, id: &FormId) -> Result<(), AdminError> {
        self.set_status(id, FormStatus::Archived).await
    }

    /// Make a definition the one kiosks present, demoting any other active one
    ///
    /// # Errors
    /// `AdminError::Gateway` if the store refuses; the cached list is rolled back
    pub async fn activate(&self, id: &FormId) -> Result<(), AdminError> {
        let demoted: Vec<FormId> = self
            .forms
            .get(&forms_key())
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|f| f.status == FormStatus::Active && &f.id != id)
            .map(|f| f.id)
            .collect();

        self.activate.run(id.clone()).await?;
        self.refresh_form(id).await;
        for other in &demoted {
            self.refresh_form(other).await;
        }
        tracing::info!(form_id = %id, demoted = demoted.len(), "survey activated");
        Ok(())
    }

    /// Delete a definition
    ///
    /// # Errors
    /// `AdminError::Gateway` if the store refuses; the cached list is rolled back
    pub async fn delete(&self, id: &FormId) -> Result<(), AdminError> {
        self.delete.run(id.clone()).await?;
        self.refresh_form(id).await;
        tracing::info!(form_id = %id, "survey deleted");
        Ok(())
    }

    async fn refresh_form(&self, id: &FormId) {
        self.form.invalidate(&form_key(id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::{DefinitionError, MemoryGateway};
    use kiosk_test_utils::{form, new_survey};
    use pretty_assertions::assert_eq;

    fn console() -> (Arc<MemoryGateway>, AdminConsole) {
        let memory = Arc::new(
            MemoryGateway::new()
                .with_definition(form("f1", FormStatus::Active))
                .with_definition(form("f2", FormStatus::Draft)),
        );
        let console = AdminConsole::new(memory.clone(), &CacheConfig::default());
        (memory, console)
    }

    #[tokio::test]
    async fn forms_newest_first() {
        let (_, console) = console();
        let ids: Vec<_> = console
            .forms()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id.to_string())
            .collect();
        assert_eq!(ids, vec!["f2", "f1"]);
    }

    #[tokio::test]
    async fn invalid_survey_never_reaches_store() {
        let (memory, console) = console();
        let err = console.create(new_survey("", 1)).await.unwrap_err();
        assert_eq!(err, AdminError::Invalid(DefinitionError::EmptyTitle));
        assert_eq!(memory.definitions().len(), 2);
    }

    #[tokio::test]
    async fn create_then_list_shows_draft() {
        let (_, console) = console();
        console.forms().await.unwrap();
        let id = console.create(new_survey("Checkout", 2)).await.unwrap();

        let created = console.form(&id).await.unwrap().unwrap();
        assert_eq!(created.status, FormStatus::Draft);
        let listed = console.forms().await.unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn update_validates_patched_questions() {
        let (_, console) = console();
        let patch = SurveyPatch {
            questions: Some(Vec::new()),
            ..SurveyPatch::default()
        };
        let err = console.update(&FormId::new("f1"), patch).await.unwrap_err();
        assert_eq!(err, AdminError::Invalid(DefinitionError::NoQuestions));
    }

    #[tokio::test]
    async fn single_form_refreshes_after_activation() {
        let (_, console) = console();
        let f2 = FormId::new("f2");
        assert_eq!(console.form(&f2).await.unwrap().unwrap().status, FormStatus::Draft);

        console.activate(&f2).await.unwrap();
        assert_eq!(console.form(&f2).await.unwrap().unwrap().status, FormStatus::Active);
        assert_eq!(
            console.form(&FormId::new("f1")).await.unwrap().unwrap().status,
            FormStatus::Draft
        );
    }

    #[tokio::test]
    async fn cached_single_form_sees_demotion() {
        let (_, console) = console();
        let f1 = FormId::new("f1");
        console.forms().await.unwrap();
        assert_eq!(console.form(&f1).await.unwrap().unwrap().status, FormStatus::Active);

        console.activate(&FormId::new("f2")).await.unwrap();
        assert_eq!(console.form(&f1).await.unwrap().unwrap().status, FormStatus::Draft);
    }

    #[tokio::test]
    async fn patch_to_active_demotes_previous() {
        let (memory, console) = console();
        let patch = SurveyPatch {
            title: Some("Renamed".into()),
            status: Some(FormStatus::Active),
            ..SurveyPatch::default()
        };
        console.update(&FormId::new("f2"), patch).await.unwrap();

        let stored = memory.definitions();
        let active: Vec<_> = stored
            .iter()
            .filter(|f| f.status == FormStatus::Active)
            .map(|f| (f.id.to_string(), f.title.clone()))
            .collect();
        assert_eq!(active, vec![("f2".to_string(), "Renamed".to_string())]);
    }

    #[tokio::test]
    async fn results_for_missing_form() {
        let (_, console) = console();
        assert_eq!(console.results(&FormId::new("nope")).await.unwrap(), None);
    }
}
