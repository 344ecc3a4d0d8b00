//! Keyed query cache using moka
//!
//! Holds the last-known value per [`QueryKey`] and tracks at most one
//! in-flight fetch per key. Concurrent readers of a key share that fetch.
//! Invalidation keeps the old value readable, marks it stale and refetches
//! in the background when a fetcher is registered, superseding any running
//! fetch.

use crate::error::CacheError;
use crate::key::QueryKey;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

/// Values the cache can hold
pub trait CachedValue: Clone + Send + Sync + 'static {
    /// Whether the value counts as "nothing cached" for optimistic writes
    fn is_vacant(&self) -> bool {
        false
    }
}

impl<T: Clone + Send + Sync + 'static> CachedValue for Vec<T> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> CachedValue for Option<T> {
    fn is_vacant(&self) -> bool {
        self.is_none()
    }
}

/// The four primitives the optimistic coordinator depends on
#[async_trait]
pub trait QueryCache<V: CachedValue>: Send + Sync {
    /// Last-known value
    async fn get(&self, key: &QueryKey) -> Option<V>;

    /// Replace the value
    async fn set(&self, key: &QueryKey, value: V);

    /// Drop any in-flight fetch so it cannot overwrite later writes
    async fn cancel_pending_fetch(&self, key: &QueryKey);

    /// Mark stale so the next read refetches
    async fn invalidate(&self, key: &QueryKey);
}

/// Produces a fresh value for a key
pub type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stale: bool,
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct InFlight<V> {
    ticket: u64,
    abort: AbortHandle,
    result: SharedFetch<V>,
}

type InFlightMap<V> = Arc<Mutex<HashMap<QueryKey, InFlight<V>>>>;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Fetches currently running
    pub in_flight: usize,
}

/// Query cache backed by a moka future cache
pub struct MokaQueryCache<V: CachedValue> {
    entries: Cache<QueryKey, Entry<V>>,
    fetchers: DashMap<QueryKey, Fetcher<V>>,
    in_flight: InFlightMap<V>,
    next_ticket: AtomicU64,
}

impl<V: CachedValue> std::fmt::Debug for MokaQueryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaQueryCache")
            .field("entry_count", &self.entries.entry_count())
            .field("fetchers", &self.fetchers.len())
            .finish_non_exhaustive()
    }
}

impl<V: CachedValue> MokaQueryCache<V> {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::new(max_capacity),
            fetchers: DashMap::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Register how to load `key` from the store
    pub fn register_fetcher(&self, key: QueryKey, fetcher: Fetcher<V>) {
        self.fetchers.insert(key, fetcher);
    }

    /// Read `key`, fetching when nothing fresh is cached
    ///
    /// Joins the fetch already running for `key` if there is one. A reader
    /// whose fetch is cancelled or superseded reads again rather than failing.
    ///
    /// # Errors
    /// - `CacheError::NoFetcher` if nothing fresh is cached and no fetcher is registered
    /// - `CacheError::FetchFailed` if the fetcher fails
    pub async fn fetch(&self, key: &QueryKey) -> Result<V, CacheError> {
        loop {
            let pending = {
                let mut in_flight = self.in_flight.lock().await;
                if let Some(entry) = self.entries.get(key).await {
                    if !entry.stale {
                        return Ok(entry.value);
                    }
                }
                let running = in_flight.get(key).map(|r| (r.ticket, r.result.clone()));
                match running {
                    Some((ticket, result)) => {
                        tracing::debug!(query_key = %key, ticket, "joining in-flight fetch");
                        result
                    }
                    None => self
                        .start_fetch(key, &mut in_flight)
                        .ok_or_else(|| CacheError::NoFetcher(key.clone()))?,
                }
            };

            match pending.await {
                Err(CacheError::Cancelled(_)) => {
                    tracing::debug!(query_key = %key, "fetch cancelled under reader, reading again");
                }
                result => return result,
            }
        }
    }

    /// Whether the cached value for `key` is marked stale
    #[must_use]
    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).await.is_some_and(|e| e.stale)
    }

    /// Whether a fetch for `key` is running
    #[must_use]
    pub async fn is_fetching(&self, key: &QueryKey) -> bool {
        self.in_flight.lock().await.contains_key(key)
    }

    /// Get cache statistics
    #[must_use]
    pub async fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks().await;
        CacheStats {
            entry_count: self.entries.entry_count(),
            in_flight: self.in_flight.lock().await.len(),
        }
    }

    /// Start a fetch for `key` and track it in `in_flight`.
    ///
    /// The caller holds the `in_flight` lock, so the task cannot finish
    /// before it is tracked. Returns `None` when no fetcher is registered.
    fn start_fetch(
        &self,
        key: &QueryKey,
        in_flight: &mut HashMap<QueryKey, InFlight<V>>,
    ) -> Option<SharedFetch<V>> {
        let fetcher = self.fetchers.get(key).map(|f| Arc::clone(f.value()))?;
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let handle = tokio::spawn(run_fetch(
            self.entries.clone(),
            Arc::clone(&self.in_flight),
            key.clone(),
            ticket,
            fetcher,
        ));
        let abort = handle.abort_handle();
        let joined_key = key.clone();
        let result = handle
            .map(move |joined| match joined {
                Ok(result) => result,
                Err(join) if join.is_cancelled() => Err(CacheError::Cancelled(joined_key)),
                Err(join) => Err(CacheError::FetchFailed {
                    key: joined_key,
                    reason: join.to_string(),
                }),
            })
            .boxed()
            .shared();

        in_flight.insert(
            key.clone(),
            InFlight {
                ticket,
                abort,
                result: result.clone(),
            },
        );
        tracing::debug!(query_key = %key, ticket, "fetch started");
        Some(result)
    }
}

impl<V: CachedValue> Default for MokaQueryCache<V> {
    /// Create cache with default capacity (1,000 entries)
    fn default() -> Self {
        Self::new(1_000)
    }
}

async fn run_fetch<V: CachedValue>(
    entries: Cache<QueryKey, Entry<V>>,
    in_flight: InFlightMap<V>,
    key: QueryKey,
    ticket: u64,
    fetcher: Fetcher<V>,
) -> Result<V, CacheError> {
    let result = fetcher().await;

    let mut guard = in_flight.lock().await;
    if guard.get(&key).map(|f| f.ticket) != Some(ticket) {
        tracing::debug!(query_key = %key, ticket, "fetch superseded, result dropped");
        return Err(CacheError::Cancelled(key));
    }
    guard.remove(&key);

    match result {
        Ok(value) => {
            entries
                .insert(
                    key,
                    Entry {
                        value: value.clone(),
                        stale: false,
                    },
                )
                .await;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(query_key = %key, error = %err, "fetch failed");
            Err(CacheError::FetchFailed {
                key,
                reason: format!("{err:#}"),
            })
        }
    }
}

#[async_trait]
impl<V: CachedValue> QueryCache<V> for MokaQueryCache<V> {
    async fn get(&self, key: &QueryKey) -> Option<V> {
        self.entries.get(key).await.map(|e| e.value)
    }

    async fn set(&self, key: &QueryKey, value: V) {
        self.entries
            .insert(key.clone(), Entry { value, stale: false })
            .await;
    }

    async fn cancel_pending_fetch(&self, key: &QueryKey) {
        if let Some(pending) = self.in_flight.lock().await.remove(key) {
            pending.abort.abort();
            tracing::debug!(query_key = %key, ticket = pending.ticket, "in-flight fetch cancelled");
        }
    }

    async fn invalidate(&self, key: &QueryKey) {
        if let Some(mut entry) = self.entries.get(key).await {
            entry.stale = true;
            self.entries.insert(key.clone(), entry).await;
        }
        let mut in_flight = self.in_flight.lock().await;
        if let Some(previous) = in_flight.remove(key) {
            previous.abort.abort();
            tracing::debug!(query_key = %key, ticket = previous.ticket, "running fetch superseded");
        }
        if self.start_fetch(key, &mut in_flight).is_some() {
            tracing::debug!(query_key = %key, "invalidated, refetching");
        } else {
            tracing::debug!(query_key = %key, "invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_fetcher(calls: Arc<AtomicUsize>, value: Vec<u32>) -> Fetcher<Vec<u32>> {
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move { Ok(value) }.boxed()
        })
    }

    #[tokio::test]
    async fn get_returns_none_for_missing() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        assert!(cache.get(&QueryKey::new(["forms"])).await.is_none());
    }

    #[tokio::test]
    async fn set_then_get() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        cache.set(&key, vec![1, 2]).await;
        assert_eq!(cache.get(&key).await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn fetch_uses_cache_once_loaded() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.register_fetcher(key.clone(), counting_fetcher(calls.clone(), vec![7]));

        assert_eq!(cache.fetch(&key).await.unwrap(), vec![7]);
        assert_eq!(cache.fetch(&key).await.unwrap(), vec![7]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_without_fetcher_fails() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        assert_eq!(cache.fetch(&key).await, Err(CacheError::NoFetcher(key)));
    }

    #[tokio::test]
    async fn fetch_error_is_reported() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        cache.register_fetcher(
            key.clone(),
            Arc::new(|| async { Err::<Vec<u32>, _>(anyhow::anyhow!("offline")) }.boxed()),
        );
        let err = cache.fetch(&key).await.unwrap_err();
        assert!(matches!(err, CacheError::FetchFailed { .. }));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_keeps_value_and_refetches() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.register_fetcher(key.clone(), counting_fetcher(calls.clone(), vec![2]));
        cache.set(&key, vec![1]).await;

        cache.invalidate(&key).await;
        // Old value stays readable while the refetch runs
        let seen = cache.get(&key).await.unwrap();
        assert!(seen == vec![1] || seen == vec![2]);

        // fetch() sees either the stale entry (and refetches) or the fresh one
        assert_eq!(cache.fetch(&key).await.unwrap(), vec![2]);
        assert!(!cache.is_stale(&key).await);
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn invalidate_without_fetcher_marks_stale() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        cache.set(&key, vec![1]).await;
        cache.invalidate(&key).await;
        assert!(cache.is_stale(&key).await);
        assert_eq!(cache.get(&key).await, Some(vec![1]));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fetch_never_writes() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        cache.register_fetcher(
            key.clone(),
            Arc::new(|| {
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, anyhow::Error>(vec![99u32])
                }
                .boxed()
            }),
        );
        cache.set(&key, vec![1]).await;
        cache.invalidate(&key).await;
        assert!(cache.is_fetching(&key).await);

        cache.cancel_pending_fetch(&key).await;
        cache.set(&key, vec![2]).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!cache.is_fetching(&key).await);
        assert_eq!(cache.get(&key).await, Some(vec![2]));
    }

    fn slow_fetcher(calls: Arc<AtomicUsize>, value: Vec<u32>) -> Fetcher<Vec<u32>> {
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(value)
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_fetches_share_one_load() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.register_fetcher(key.clone(), slow_fetcher(calls.clone(), vec![3]));

        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));

        assert_eq!(a, Ok(vec![3]));
        assert_eq!(b, Ok(vec![3]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reader_survives_cancelled_fetch() {
        let cache = Arc::new(MokaQueryCache::<Vec<u32>>::new(10));
        let key = QueryKey::new(["forms"]);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.register_fetcher(key.clone(), slow_fetcher(calls, vec![99]));

        let reader = tokio::spawn({
            let cache = Arc::clone(&cache);
            let key = key.clone();
            async move { cache.fetch(&key).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.is_fetching(&key).await);

        cache.cancel_pending_fetch(&key).await;
        cache.set(&key, vec![2]).await;

        assert_eq!(reader.await.unwrap(), Ok(vec![2]));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_supersedes_running_fetch() {
        let cache = MokaQueryCache::<Vec<u32>>::new(10);
        let key = QueryKey::new(["forms"]);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.register_fetcher(key.clone(), slow_fetcher(calls.clone(), vec![4]));
        cache.set(&key, vec![1]).await;

        cache.invalidate(&key).await;
        cache.invalidate(&key).await;
        assert_eq!(cache.fetch(&key).await, Ok(vec![4]));
        assert!(!cache.is_fetching(&key).await);
        assert!(calls.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn vacancy_of_collections() {
        assert!(Vec::<u8>::new().is_vacant());
        assert!(!vec![1u8].is_vacant());
        assert!(None::<u8>.is_vacant());
        assert!(!Some(1u8).is_vacant());
    }
}
