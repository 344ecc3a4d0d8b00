//! Testing utilities for the kiosk workspace
//!
//! Shared fixtures, a call-recording cache and a fault-injecting gateway.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kiosk_cache::{CachedValue, QueryCache, QueryKey};
use kiosk_core::{
    Answer, FormId, FormStatus, GatewayError, MemoryGateway, NewSurvey, Question, ResponseId,
    ResponseRecord, StoredResponse, SurveyDefinition, SurveyGateway, SurveyPatch,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Question `q{n}` with answers `q{n}a1..q{n}a{answers}`
pub fn question(n: usize, answers: usize) -> Question {
    let id = format!("q{n}");
    let answers = (1..=answers)
        .map(|a| Answer::labelled(format!("{id}a{a}"), format!("Option {a}")))
        .collect();
    Question::new(id, format!("Question {n}?"), answers)
}

/// Active definition with `questions` questions of three answers each
pub fn survey(id: &str, questions: usize, randomize: bool) -> SurveyDefinition {
    SurveyDefinition {
        id: FormId::new(id),
        title: format!("Survey {id}"),
        status: FormStatus::Active,
        randomize,
        questions: (1..=questions).map(|n| question(n, 3)).collect(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().unwrap_or_else(Utc::now),
    }
}

/// The non-randomized three-question survey `f1`
pub fn three_question_survey() -> SurveyDefinition {
    survey("f1", 3, false)
}

/// Draft definition with the given id and status
pub fn form(id: &str, status: FormStatus) -> SurveyDefinition {
    SurveyDefinition {
        status,
        ..survey(id, 1, false)
    }
}

/// Authoring input with `questions` questions of two answers each
pub fn new_survey(title: &str, questions: usize) -> NewSurvey {
    NewSurvey {
        title: title.to_string(),
        randomize: false,
        questions: (1..=questions).map(|n| question(n, 2)).collect(),
    }
}

/// One observed cache primitive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    Get(QueryKey),
    Set(QueryKey),
    CancelPendingFetch(QueryKey),
    Invalidate(QueryKey),
}

/// Cache that records every primitive call
#[derive(Debug)]
pub struct RecordingCache<V> {
    values: Mutex<HashMap<QueryKey, V>>,
    calls: Mutex<Vec<CacheCall>>,
}

impl<V: CachedValue> RecordingCache<V> {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Put a value in place without recording a call
    pub fn seed(&self, key: &QueryKey, value: V) {
        self.values.lock().insert(key.clone(), value);
    }

    /// Current value without recording a call
    pub fn value(&self, key: &QueryKey) -> Option<V> {
        self.values.lock().get(key).cloned()
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().clone()
    }

    pub fn sets(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, CacheCall::Set(_)))
            .count()
    }

    pub fn invalidations(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, CacheCall::Invalidate(_)))
            .count()
    }
}

impl<V: CachedValue> Default for RecordingCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: CachedValue> QueryCache<V> for RecordingCache<V> {
    async fn get(&self, key: &QueryKey) -> Option<V> {
        self.calls.lock().push(CacheCall::Get(key.clone()));
        self.values.lock().get(key).cloned()
    }

    async fn set(&self, key: &QueryKey, value: V) {
        self.calls.lock().push(CacheCall::Set(key.clone()));
        self.values.lock().insert(key.clone(), value);
    }

    async fn cancel_pending_fetch(&self, key: &QueryKey) {
        self.calls.lock().push(CacheCall::CancelPendingFetch(key.clone()));
    }

    async fn invalidate(&self, key: &QueryKey) {
        self.calls.lock().push(CacheCall::Invalidate(key.clone()));
    }
}

/// Gateway wrapper that can be switched offline
#[derive(Debug, Default)]
pub struct FlakyGateway {
    inner: Arc<MemoryGateway>,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
    submissions: AtomicUsize,
}

impl FlakyGateway {
    pub fn new(inner: Arc<MemoryGateway>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &Arc<MemoryGateway> {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    /// Submission attempts, including failed ones
    pub fn submission_attempts(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<(), GatewayError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> Result<(), GatewayError> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SurveyGateway for FlakyGateway {
    async fn fetch_active_definition(&self) -> Result<Option<SurveyDefinition>, GatewayError> {
        self.read()?;
        self.inner.fetch_active_definition().await
    }

    async fn submit_response(&self, record: ResponseRecord) -> Result<ResponseId, GatewayError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.write()?;
        self.inner.submit_response(record).await
    }

    async fn list_definitions(&self) -> Result<Vec<SurveyDefinition>, GatewayError> {
        self.read()?;
        self.inner.list_definitions().await
    }

    async fn fetch_definition(&self, id: &FormId) -> Result<Option<SurveyDefinition>, GatewayError> {
        self.read()?;
        self.inner.fetch_definition(id).await
    }

    async fn create_definition(&self, survey: NewSurvey) -> Result<FormId, GatewayError> {
        self.write()?;
        self.inner.create_definition(survey).await
    }

    async fn update_definition(&self, id: &FormId, patch: SurveyPatch) -> Result<(), GatewayError> {
        self.write()?;
        self.inner.update_definition(id, patch).await
    }

    async fn activate_definition(&self, id: &FormId) -> Result<(), GatewayError> {
        self.write()?;
        self.inner.activate_definition(id).await
    }

    async fn delete_definition(&self, id: &FormId) -> Result<(), GatewayError> {
        self.write()?;
        self.inner.delete_definition(id).await
    }

    async fn list_responses(&self, form_id: &FormId) -> Result<Vec<StoredResponse>, GatewayError> {
        self.read()?;
        self.inner.list_responses(form_id).await
    }
}
