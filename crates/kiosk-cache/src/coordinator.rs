//! Optimistic mutation coordinator
//!
//! Turns one "intent to mutate" into an ordered pipeline against a cached,
//! remotely-backed value:
//!
//! ```text
//! cancel -> snapshot -> apply -> await mutation -> (failure: hook, rollback) -> settle: hook, invalidate
//! ```
//!
//! The first three stages finish before the mutation is awaited, so readers of
//! the cache see either the pre-mutation value or the optimistic one, never a
//! half-applied write.
//!
//! Two `run` calls on the same key are not queued: the second snapshots
//! whatever the first applied, and rolling the second back restores that
//! intermediate value rather than the value before the first call.

use crate::cache::{CachedValue, QueryCache};
use crate::key::QueryKey;
use futures::future::BoxFuture;
use std::fmt::Display;
use std::sync::Arc;

/// The remote operation being coordinated
pub type MutationFn<Vars, T, E> =
    Arc<dyn Fn(Vars) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Computes the optimistic cache value from the current one
pub type Updater<V, Vars> = Arc<dyn Fn(&V, &Vars) -> anyhow::Result<V> + Send + Sync>;

/// Called with the mutation error before rollback
pub type FailureHook<Vars, E> = Arc<dyn Fn(&E, &Vars) -> anyhow::Result<()> + Send + Sync>;

/// Called once the mutation has succeeded or failed
pub type SettleHook<Vars, T, E> =
    Arc<dyn Fn(Result<&T, &E>, &Vars) -> anyhow::Result<()> + Send + Sync>;

/// Cache state captured before the optimistic write, scoped to one `run`
#[derive(Debug)]
struct MutationSnapshot<V> {
    query_key: QueryKey,
    previous_value: Option<V>,
    applied: bool,
}

/// Runs a mutation while keeping one cache key optimistically up to date
pub struct OptimisticMutation<V, Vars, T, E> {
    cache: Arc<dyn QueryCache<V>>,
    query_key: QueryKey,
    mutation: MutationFn<Vars, T, E>,
    updater: Option<Updater<V, Vars>>,
    invalidate_on_settled: bool,
    on_error: Option<FailureHook<Vars, E>>,
    on_settled: Option<SettleHook<Vars, T, E>>,
}

impl<V, Vars, T, E> std::fmt::Debug for OptimisticMutation<V, Vars, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticMutation")
            .field("query_key", &self.query_key)
            .field("invalidate_on_settled", &self.invalidate_on_settled)
            .field("on_error", &self.on_error.is_some())
            .field("on_settled", &self.on_settled.is_some())
            .finish_non_exhaustive()
    }
}

impl<V, Vars, T, E> OptimisticMutation<V, Vars, T, E>
where
    V: CachedValue,
    Vars: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Display + Send + Sync + 'static,
{
    /// Create a coordinator for `query_key`
    ///
    /// # Arguments
    /// * `cache` - Cache holding the value under `query_key`
    /// * `query_key` - Key to update optimistically and invalidate afterwards
    /// * `mutation` - Remote operation
    /// * `updater` - Computes the optimistic value from the cached one
    pub fn new(
        cache: Arc<dyn QueryCache<V>>,
        query_key: QueryKey,
        mutation: MutationFn<Vars, T, E>,
        updater: Updater<V, Vars>,
    ) -> Self {
        Self {
            cache,
            query_key,
            mutation,
            updater: Some(updater),
            invalidate_on_settled: true,
            on_error: None,
            on_settled: None,
        }
    }

    /// Create a coordinator that never writes a preview, for mutations whose
    /// result cannot be predicted locally. Rollback and invalidation still run.
    #[must_use]
    pub fn without_preview(
        cache: Arc<dyn QueryCache<V>>,
        query_key: QueryKey,
        mutation: MutationFn<Vars, T, E>,
    ) -> Self {
        Self {
            cache,
            query_key,
            mutation,
            updater: None,
            invalidate_on_settled: true,
            on_error: None,
            on_settled: None,
        }
    }

    /// Whether to mark the key stale once settled (default: yes)
    #[inline]
    #[must_use]
    pub fn invalidate_on_settled(mut self, invalidate: bool) -> Self {
        self.invalidate_on_settled = invalidate;
        self
    }

    /// Hook run on failure, before rollback
    #[inline]
    #[must_use]
    pub fn on_error(mut self, hook: FailureHook<Vars, E>) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Hook run after success or failure, before invalidation
    #[inline]
    #[must_use]
    pub fn on_settled(mut self, hook: SettleHook<Vars, T, E>) -> Self {
        self.on_settled = Some(hook);
        self
    }

    /// Key this coordinator manages
    #[inline]
    #[must_use]
    pub fn query_key(&self) -> &QueryKey {
        &self.query_key
    }

    /// Execute the mutation
    ///
    /// # Errors
    /// Returns the mutation's own error, after the cache has been rolled back
    /// and the settle stage has run.
    pub async fn run(&self, variables: Vars) -> Result<T, E> {
        let snapshot = self.prepare(&variables).await;

        let outcome = (self.mutation)(variables.clone()).await;

        if let Err(err) = &outcome {
            self.recover(&snapshot, err, &variables).await;
        }
        self.settle(&snapshot, outcome.as_ref(), &variables).await;

        outcome
    }

    /// Cancel, snapshot and apply
    async fn prepare(&self, variables: &Vars) -> MutationSnapshot<V> {
        let key = &self.query_key;
        self.cache.cancel_pending_fetch(key).await;

        let previous_value = self.cache.get(key).await;

        // NOTE: vacant values (None, empty collections) get no preview. For
        // keys whose natural state is an empty list this hides the first
        // optimistic insert until the settle refetch lands.
        let applied = match (&previous_value, &self.updater) {
            (_, None) => false,
            (Some(current), Some(updater)) if !current.is_vacant() => match updater(current, variables) {
                Ok(next) => {
                    self.cache.set(key, next).await;
                    true
                }
                Err(err) => {
                    tracing::warn!(query_key = %key, error = %err, "optimistic update failed, dispatching without preview");
                    false
                }
            },
            _ => {
                tracing::debug!(query_key = %key, "nothing cached, skipping optimistic write");
                false
            }
        };

        MutationSnapshot {
            query_key: key.clone(),
            previous_value,
            applied,
        }
    }

    /// Failure hook, then rollback regardless of what the hook returned
    async fn recover(&self, snapshot: &MutationSnapshot<V>, err: &E, variables: &Vars) {
        tracing::warn!(query_key = %snapshot.query_key, error = %err, "mutation failed");

        if let Some(hook) = &self.on_error {
            if let Err(hook_err) = hook(err, variables) {
                tracing::warn!(query_key = %snapshot.query_key, error = %hook_err, "failure hook errored");
            }
        }

        match &snapshot.previous_value {
            Some(previous) => {
                self.cache.set(&snapshot.query_key, previous.clone()).await;
                tracing::debug!(query_key = %snapshot.query_key, "rolled back");
            }
            None => {
                tracing::debug!(query_key = %snapshot.query_key, "nothing cached before mutation, no rollback");
            }
        }
    }

    /// Settle hook, then invalidate if configured
    async fn settle(&self, snapshot: &MutationSnapshot<V>, outcome: Result<&T, &E>, variables: &Vars) {
        if let Some(hook) = &self.on_settled {
            if let Err(hook_err) = hook(outcome, variables) {
                tracing::warn!(query_key = %snapshot.query_key, error = %hook_err, "settle hook errored");
            }
        }

        if self.invalidate_on_settled {
            self.cache.invalidate(&snapshot.query_key).await;
        }
        tracing::debug!(
            query_key = %snapshot.query_key,
            previewed = snapshot.applied,
            succeeded = outcome.is_ok(),
            "mutation settled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaQueryCache;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: &'static str,
        status: &'static str,
    }

    type Rows = Vec<Row>;

    fn set_status() -> Updater<Rows, (&'static str, &'static str)> {
        Arc::new(|rows: &Rows, (id, status): &(&'static str, &'static str)| {
            Ok(rows
                .iter()
                .map(|r| {
                    if r.id == *id {
                        Row {
                            id: r.id,
                            status: *status,
                        }
                    } else {
                        r.clone()
                    }
                })
                .collect())
        })
    }

    fn failing() -> MutationFn<(&'static str, &'static str), (), String> {
        Arc::new(|_| async { Err("store offline".to_string()) }.boxed())
    }

    fn succeeding() -> MutationFn<(&'static str, &'static str), (), String> {
        Arc::new(|_| async { Ok(()) }.boxed())
    }

    fn key() -> QueryKey {
        QueryKey::new(["forms"])
    }

    fn shared(cache: &Arc<MokaQueryCache<Rows>>) -> Arc<dyn QueryCache<Rows>> {
        cache.clone()
    }

    #[tokio::test]
    async fn success_keeps_optimistic_value() {
        let cache = Arc::new(MokaQueryCache::<Rows>::new(10));
        cache.set(&key(), vec![Row { id: "f1", status: "draft" }]).await;

        let mutation = OptimisticMutation::new(shared(&cache), key(), succeeding(), set_status())
            .invalidate_on_settled(false);
        mutation.run(("f1", "active")).await.unwrap();

        assert_eq!(
            cache.get(&key()).await,
            Some(vec![Row { id: "f1", status: "active" }])
        );
    }

    #[tokio::test]
    async fn failure_rolls_back() {
        let cache = Arc::new(MokaQueryCache::<Rows>::new(10));
        let before = vec![Row { id: "f1", status: "draft" }];
        cache.set(&key(), before.clone()).await;

        let mutation = OptimisticMutation::new(shared(&cache), key(), failing(), set_status());
        let err = mutation.run(("f1", "active")).await.unwrap_err();

        assert_eq!(err, "store offline");
        assert_eq!(cache.get(&key()).await, Some(before));
        assert!(cache.is_stale(&key()).await);
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_rollback() {
        let cache = Arc::new(MokaQueryCache::<Rows>::new(10));
        let before = vec![Row { id: "f1", status: "draft" }];
        cache.set(&key(), before.clone()).await;
        let settled = Arc::new(AtomicUsize::new(0));
        let settled_hook = settled.clone();

        let mutation = OptimisticMutation::new(shared(&cache), key(), failing(), set_status())
            .on_error(Arc::new(|_, _| Err(anyhow::anyhow!("hook broke"))))
            .on_settled(Arc::new(move |outcome, _| {
                assert!(outcome.is_err());
                settled_hook.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        assert!(mutation.run(("f1", "active")).await.is_err());

        assert_eq!(cache.get(&key()).await, Some(before));
        assert_eq!(settled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn updater_error_still_dispatches() {
        let cache = Arc::new(MokaQueryCache::<Rows>::new(10));
        let before = vec![Row { id: "f1", status: "draft" }];
        cache.set(&key(), before.clone()).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let mutation: OptimisticMutation<Rows, (&'static str, &'static str), (), String> =
            OptimisticMutation::new(
                shared(&cache),
                key(),
                Arc::new(move |_| {
                    calls_in.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }.boxed()
                }),
                Arc::new(|_, _| Err(anyhow::anyhow!("bad preview"))),
            )
            .invalidate_on_settled(false);
        mutation.run(("f1", "active")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&key()).await, Some(before));
    }

    #[tokio::test]
    async fn chained_mutations_roll_back_to_intermediate_value() {
        let cache = Arc::new(MokaQueryCache::<Rows>::new(10));
        cache.set(&key(), vec![Row { id: "f1", status: "draft" }]).await;
        let active = vec![Row { id: "f1", status: "active" }];

        let (release, gate) = tokio::sync::oneshot::channel::<()>();
        let gate = Arc::new(tokio::sync::Mutex::new(Some(gate)));
        let held: MutationFn<(&'static str, &'static str), (), String> = Arc::new(move |_| {
            let gate = gate.clone();
            async move {
                if let Some(rx) = gate.lock().await.take() {
                    let _ = rx.await;
                }
                Ok(())
            }
            .boxed()
        });
        let first = Arc::new(
            OptimisticMutation::new(shared(&cache), key(), held, set_status())
                .invalidate_on_settled(false),
        );
        let second = OptimisticMutation::new(shared(&cache), key(), failing(), set_status())
            .invalidate_on_settled(false);

        let running = tokio::spawn({
            let first = first.clone();
            async move { first.run(("f1", "active")).await }
        });
        while cache.get(&key()).await.as_ref() != Some(&active) {
            tokio::task::yield_now().await;
        }

        // First is still in flight: the second snapshots its optimistic value
        second.run(("f1", "archived")).await.unwrap_err();
        assert_eq!(cache.get(&key()).await, Some(active.clone()));

        release.send(()).unwrap();
        running.await.unwrap().unwrap();
        assert_eq!(cache.get(&key()).await, Some(active));
    }

    #[tokio::test]
    async fn without_preview_leaves_cache_until_settled() {
        let cache = Arc::new(MokaQueryCache::<Rows>::new(10));
        let before = vec![Row { id: "f1", status: "draft" }];
        cache.set(&key(), before.clone()).await;

        let mutation = OptimisticMutation::without_preview(shared(&cache), key(), succeeding());
        mutation.run(("f2", "draft")).await.unwrap();

        assert_eq!(cache.get(&key()).await, Some(before));
        assert!(cache.is_stale(&key()).await);
    }
}
