//! Query cache with request de-duplication and mutation-driven invalidation.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::key::{KeyPattern, QueryKey};

/// Entries are served without refetching for this long.
const DEFAULT_STALE_MINUTES: i64 = 2;

/// Entries are dropped from memory after this long.
const DEFAULT_EVICT_MINUTES: i64 = 5;

type Payload = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Payload, CacheError>>>;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The fetcher or mutation failed. Shared so every waiter on a
    /// de-duplicated request receives the same error.
    #[error("{0:#}")]
    Fetch(Arc<anyhow::Error>),

    #[error("Cached value for {0} has a different type than requested")]
    TypeMismatch(String),
}

impl From<anyhow::Error> for CacheError {
    fn from(err: anyhow::Error) -> Self {
        CacheError::Fetch(Arc::new(err))
    }
}

impl CacheError {
    /// The underlying fetch error, for callers that want to downcast it.
    pub fn fetch_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Fetch(err) => Some(err),
            CacheError::TypeMismatch(_) => None,
        }
    }
}

/// Freshness policy for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_after: Duration,
    pub evict_after: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_after: Duration::minutes(DEFAULT_STALE_MINUTES),
            evict_after: Duration::minutes(DEFAULT_EVICT_MINUTES),
        }
    }
}

struct CacheEntry {
    payload: Payload,
    cached_at: DateTime<Utc>,
    evict_after: Duration,
}

impl CacheEntry {
    fn new(payload: Payload, evict_after: Duration) -> Self {
        Self {
            payload,
            cached_at: Utc::now(),
            evict_after,
        }
    }

    fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    fn is_fresh(&self, stale_after: Duration) -> bool {
        self.age() < stale_after
    }

    fn is_expired(&self) -> bool {
        self.age() >= self.evict_after
    }
}

#[derive(Default)]
struct Store {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Reads currently on the wire, tagged with a fetch id so a fetch that
    /// was detached by invalidation cannot write its result back.
    in_flight: HashMap<QueryKey, (u64, SharedFetch)>,
}

/// Process-wide read cache. Clone is cheap and clones share the same store.
#[derive(Clone, Default)]
pub struct QueryClient {
    store: Arc<Mutex<Store>>,
    next_fetch_id: Arc<AtomicU64>,
}

fn downcast<T: Clone + 'static>(key: &QueryKey, payload: &Payload) -> Result<T, CacheError> {
    payload
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| CacheError::TypeMismatch(key.to_string()))
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key` if it is fresh, otherwise run
    /// `fetcher` and cache its result.
    ///
    /// Concurrent calls for the same key while a fetch is outstanding all
    /// await that one fetch; `fetcher` is not invoked for them. A failed
    /// fetch leaves the cache untouched.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetcher: F) -> Result<T, CacheError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let shared = {
            let mut store = self.store.lock().await;
            store.entries.retain(|_, entry| !entry.is_expired());

            if let Some(entry) = store.entries.get(&key) {
                if entry.is_fresh(options.stale_after) {
                    debug!(key = %key, "Cache hit");
                    return downcast(&key, &entry.payload);
                }
            }

            match store.in_flight.get(&key) {
                Some((_, pending)) => {
                    debug!(key = %key, "Joining in-flight request");
                    pending.clone()
                }
                None => {
                    debug!(key = %key, "Cache miss, fetching");
                    let fetch_id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let pending = self.spawn_fetch(key.clone(), fetch_id, options.evict_after, fetcher());
                    store.in_flight.insert(key.clone(), (fetch_id, pending.clone()));
                    pending
                }
            }
        };

        let payload = shared.await?;
        downcast(&key, &payload)
    }

    /// Wrap a fetch so that whichever waiter drives it to completion also
    /// records the result, provided the fetch is still the registered one.
    fn spawn_fetch<T, Fut>(&self, key: QueryKey, fetch_id: u64, evict_after: Duration, fetch: Fut) -> SharedFetch
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        async move {
            let result = fetch
                .await
                .map(|value| Arc::new(value) as Payload)
                .map_err(CacheError::from);

            let mut store = store.lock().await;
            let registered = matches!(store.in_flight.get(&key), Some((id, _)) if *id == fetch_id);
            if registered {
                store.in_flight.remove(&key);
                match &result {
                    Ok(payload) => {
                        store
                            .entries
                            .insert(key, CacheEntry::new(Arc::clone(payload), evict_after));
                    }
                    Err(err) => debug!(key = %key, error = %err, "Fetch failed, nothing cached"),
                }
            } else {
                debug!(key = %key, "Fetch was invalidated while in flight, result not cached");
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Run a write. On success, evict every entry matching `invalidates` so
    /// the next read of those keys goes to the network. On failure nothing
    /// is evicted.
    pub async fn mutate<T, F, Fut>(&self, invalidates: &[KeyPattern], fetcher: F) -> Result<T, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let value = fetcher().await?;
        let evicted = self.invalidate(invalidates).await;
        info!(patterns = invalidates.len(), evicted = evicted, "Mutation succeeded");
        Ok(value)
    }

    /// Evict matching entries and detach matching in-flight reads. Patterns
    /// that match nothing are ignored. Returns the number of entries evicted.
    pub async fn invalidate(&self, patterns: &[KeyPattern]) -> usize {
        let matches_any = |key: &QueryKey| patterns.iter().any(|p| p.matches(key));

        let mut store = self.store.lock().await;
        let before = store.entries.len();
        store.entries.retain(|key, _| !matches_any(key));
        store.in_flight.retain(|key, _| !matches_any(key));
        let evicted = before - store.entries.len();
        debug!(evicted = evicted, "Invalidated cache entries");
        evicted
    }

    /// Seed or replace the entry for `key`, e.g. with the value a write returned.
    pub async fn set_query_data<T>(&self, key: QueryKey, value: T, options: QueryOptions)
    where
        T: Send + Sync + 'static,
    {
        let mut store = self.store.lock().await;
        // A read started before this write must not overwrite it
        store.in_flight.remove(&key);
        store
            .entries
            .insert(key, CacheEntry::new(Arc::new(value), options.evict_after));
    }

    /// The cached value for `key`, fresh or not, without fetching.
    pub async fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let store = self.store.lock().await;
        store
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| entry.payload.downcast_ref::<T>().cloned())
    }

    /// When the entry for `key` was stored.
    pub async fn cached_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        let store = self.store.lock().await;
        store.entries.get(key).map(|entry| entry.cached_at)
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut store = self.store.lock().await;
        let before = store.entries.len();
        store.entries.retain(|_, entry| !entry.is_expired());
        before - store.entries.len()
    }

    pub async fn clear(&self) {
        let mut store = self.store.lock().await;
        store.entries.clear();
        store.in_flight.clear();
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    async fn backdate(&self, key: &QueryKey, by: Duration) {
        let mut store = self.store.lock().await;
        if let Some(entry) = store.entries.get_mut(key) {
            entry.cached_at = entry.cached_at - by;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
