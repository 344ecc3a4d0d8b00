//! Optimistic mutations over the cached definition list
//!
//! Each constructor pairs a gateway call with the updater that predicts its
//! effect on `["forms"]`. The coordinator rolls the list back if the store
//! refuses and marks it stale once the call settles.

use futures::FutureExt;
use kiosk_cache::{OptimisticMutation, QueryCache, QueryKey};
use kiosk_core::{
    FormId, FormStatus, GatewayError, NewSurvey, SharedGateway, SurveyDefinition, SurveyPatch,
};
use std::sync::Arc;

/// Cached definition list
pub type FormsCache = Arc<dyn QueryCache<Vec<SurveyDefinition>>>;

/// Rewrites a definition in place
pub type UpdateMutation =
    OptimisticMutation<Vec<SurveyDefinition>, (FormId, SurveyPatch), (), GatewayError>;

/// Makes one definition the active one
pub type ActivateMutation = OptimisticMutation<Vec<SurveyDefinition>, FormId, (), GatewayError>;

/// Removes a definition
pub type DeleteMutation = OptimisticMutation<Vec<SurveyDefinition>, FormId, (), GatewayError>;

/// Creates a definition
pub type CreateMutation = OptimisticMutation<Vec<SurveyDefinition>, NewSurvey, FormId, GatewayError>;

/// Key of the definition list
#[must_use]
pub fn forms_key() -> QueryKey {
    QueryKey::new(["forms"])
}

/// Key of a single definition
#[must_use]
pub fn form_key(id: &FormId) -> QueryKey {
    QueryKey::new(["forms", id.as_str()])
}

/// Patch a definition; the cached entry is patched the same way
#[must_use]
pub fn update(gateway: SharedGateway, cache: FormsCache) -> UpdateMutation {
    UpdateMutation::new(
        cache,
        forms_key(),
        Arc::new(move |(id, patch): (FormId, SurveyPatch)| {
            let gateway = Arc::clone(&gateway);
            async move { gateway.update_definition(&id, patch).await }.boxed()
        }),
        Arc::new(|forms: &Vec<SurveyDefinition>, (id, patch): &(FormId, SurveyPatch)| {
            Ok(forms
                .iter()
                .map(|form| {
                    let mut form = form.clone();
                    if form.id == *id {
                        patch.apply_to(&mut form);
                    }
                    form
                })
                .collect())
        }),
    )
}

/// Activate a definition, demoting any other active one to draft
#[must_use]
pub fn activate(gateway: SharedGateway, cache: FormsCache) -> ActivateMutation {
    ActivateMutation::new(
        cache,
        forms_key(),
        Arc::new(move |id: FormId| {
            let gateway = Arc::clone(&gateway);
            async move { gateway.activate_definition(&id).await }.boxed()
        }),
        Arc::new(|forms: &Vec<SurveyDefinition>, id: &FormId| {
            Ok(forms
                .iter()
                .map(|form| {
                    let mut form = form.clone();
                    if form.id == *id {
                        form.status = FormStatus::Active;
                    } else if form.status == FormStatus::Active {
                        form.status = FormStatus::Draft;
                    }
                    form
                })
                .collect())
        }),
    )
}

/// Delete a definition; it disappears from the cached list immediately
#[must_use]
pub fn delete(gateway: SharedGateway, cache: FormsCache) -> DeleteMutation {
    DeleteMutation::new(
        cache,
        forms_key(),
        Arc::new(move |id: FormId| {
            let gateway = Arc::clone(&gateway);
            async move { gateway.delete_definition(&id).await }.boxed()
        }),
        Arc::new(|forms: &Vec<SurveyDefinition>, id: &FormId| {
            Ok(forms.iter().filter(|form| form.id != *id).cloned().collect())
        }),
    )
}

/// Create a draft definition. The store assigns the id, so there is no
/// preview; the list is refreshed once the call settles.
#[must_use]
pub fn create(gateway: SharedGateway, cache: FormsCache) -> CreateMutation {
    CreateMutation::without_preview(
        cache,
        forms_key(),
        Arc::new(move |survey: NewSurvey| {
            let gateway = Arc::clone(&gateway);
            async move { gateway.create_definition(survey).await }.boxed()
        }),
    )
}
