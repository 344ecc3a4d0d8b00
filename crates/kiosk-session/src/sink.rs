//! Where finished sessions go
//!
//! Submission is fire-and-forget from the session's point of view: sinks spawn
//! the write and return immediately, and failures are logged and dropped so a
//! network blip never stalls the kiosk.

use chrono::Utc;
use futures::FutureExt;
use kiosk_cache::{responses_key, OptimisticMutation, QueryCache};
use kiosk_core::{
    FormId, GatewayError, ResponseId, ResponseRecord, SharedGateway, StoredResponse,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Receives one record per finished session
#[cfg_attr(test, mockall::automock)]
pub trait ResponseSink: Send + Sync {
    /// Hand off a record; must not block
    fn submit(&self, record: ResponseRecord);
}

/// Submission tasks still running
#[derive(Debug, Clone, Default)]
struct InFlight {
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl InFlight {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(tokio::spawn(task));
    }

    async fn flush(&self) {
        let pending = std::mem::take(&mut *self.tasks.lock());
        for task in pending {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "submission task failed");
            }
        }
    }
}

/// Submits straight to the gateway
#[derive(Clone)]
pub struct GatewaySink {
    gateway: SharedGateway,
    in_flight: InFlight,
}

impl std::fmt::Debug for GatewaySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySink").finish_non_exhaustive()
    }
}

impl GatewaySink {
    /// Create a sink over `gateway`
    #[inline]
    #[must_use]
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            in_flight: InFlight::default(),
        }
    }

    /// Wait for every submission handed off so far
    pub async fn flush(&self) {
        self.in_flight.flush().await;
    }
}

impl ResponseSink for GatewaySink {
    fn submit(&self, record: ResponseRecord) {
        let gateway = Arc::clone(&self.gateway);
        self.in_flight.spawn(async move {
            let form_id = record.form_id.clone();
            let status = record.status;
            match gateway.submit_response(record).await {
                Ok(id) => tracing::info!(form_id = %form_id, response_id = %id, ?status, "response stored"),
                Err(err) => tracing::warn!(form_id = %form_id, ?status, error = %err, "response lost"),
            }
        });
    }
}

type SubmitMutation = OptimisticMutation<Vec<StoredResponse>, ResponseRecord, ResponseId, GatewayError>;

/// Submits through the optimistic coordinator so a cached response list for
/// the same definition shows the record before the store confirms it
pub struct CoordinatedSink {
    mutation: Arc<SubmitMutation>,
    in_flight: InFlight,
}

impl std::fmt::Debug for CoordinatedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatedSink")
            .field("query_key", self.mutation.query_key())
            .finish()
    }
}

impl CoordinatedSink {
    /// Create a sink for responses to `form_id`
    #[must_use]
    pub fn new(
        gateway: SharedGateway,
        cache: Arc<dyn QueryCache<Vec<StoredResponse>>>,
        form_id: &FormId,
        invalidate_on_settled: bool,
    ) -> Self {
        let mutation = SubmitMutation::new(
            cache,
            responses_key(form_id),
            Arc::new(move |record: ResponseRecord| {
                let gateway = Arc::clone(&gateway);
                async move { gateway.submit_response(record).await }.boxed()
            }),
            Arc::new(|responses: &Vec<StoredResponse>, record: &ResponseRecord| {
                let mut next = Vec::with_capacity(responses.len() + 1);
                next.push(StoredResponse {
                    id: ResponseId::new("pending"),
                    record: record.clone(),
                    timestamp: Utc::now(),
                });
                next.extend(responses.iter().cloned());
                Ok(next)
            }),
        )
        .invalidate_on_settled(invalidate_on_settled);

        Self {
            mutation: Arc::new(mutation),
            in_flight: InFlight::default(),
        }
    }

    /// Wait for every submission handed off so far
    pub async fn flush(&self) {
        self.in_flight.flush().await;
    }
}

impl ResponseSink for CoordinatedSink {
    fn submit(&self, record: ResponseRecord) {
        let mutation = Arc::clone(&self.mutation);
        self.in_flight.spawn(async move {
            let form_id = record.form_id.clone();
            let status = record.status;
            match mutation.run(record).await {
                Ok(id) => tracing::info!(form_id = %form_id, response_id = %id, ?status, "response stored"),
                Err(err) => tracing::warn!(form_id = %form_id, ?status, error = %err, "response lost"),
            }
        });
    }
}
