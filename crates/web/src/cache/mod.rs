//! Read-through query cache for backend table reads.
//!
//! Every page render reads through [`QueryCache`] instead of calling the
//! table API directly. The cache gives each [`QueryKey`] three behaviors:
//!
//! - **Fresh hits** are served from memory without touching the backend.
//! - **Stale hits** are served immediately while one background refresh
//!   runs; readers never wait on revalidation.
//! - **Misses** await a fetch, and concurrent readers of the same key
//!   share a single in-flight request.
//!
//! Writes never touch cached values directly. After a successful write the
//! caller invalidates the affected [`ResourceFamily`]; invalidation marks
//! matching entries stale and eagerly refetches only keys somebody watches
//! (the live feed stream). Failed fetches leave the previous value in
//! place, so a flaky backend degrades to stale pages rather than errors.

pub mod fetcher;
pub mod key;
pub mod value;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::CacheConfig;

pub use fetcher::{QueryFetcher, SupabaseFetcher};
pub use key::{QueryKey, ResourceFamily, families_for_table};
pub use value::CacheValue;

/// Hard cap on cached entries before eviction.
const MAX_ENTRIES: u64 = 1000;

/// Entries nobody has read for this long are evicted outright.
/// Logical staleness is tracked separately per entry.
const ENTRY_IDLE_EVICTION: Duration = Duration::from_secs(1800);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors surfaced to readers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The fetch failed on every attempt and no cached value exists.
    #[error("fetch for `{key}` failed after {attempts} attempt(s): {message}")]
    Fetch {
        key: String,
        attempts: u32,
        message: String,
    },
    /// A key was unwrapped with the wrong typed accessor.
    #[error("cached value has the wrong shape: expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },
}

/// Change notices delivered to [`QueryWatcher`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The key was marked stale by a write or a realtime change notice.
    Invalidated { key: QueryKey },
    /// A fetch completed and the cached value was replaced.
    Refreshed { key: QueryKey },
    /// A refresh failed; the previous value (if any) is still served.
    RefreshFailed { key: QueryKey },
}

impl CacheEvent {
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        match self {
            Self::Invalidated { key } | Self::Refreshed { key } | Self::RefreshFailed { key } => {
                key
            }
        }
    }
}

/// Per-read overrides.
///
/// Options apply when a call starts the fetch; a reader that joins an
/// already in-flight fetch shares its settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Age at which a cached value stops being fresh. `None` uses the
    /// configured default.
    pub stale_after: Option<Duration>,
    /// Extra fetch attempts after the first failure. `None` uses the
    /// configured default.
    pub retry_limit: Option<u32>,
}

#[derive(Clone)]
struct StoredEntry {
    value: CacheValue,
    fetched_at: Instant,
    stale: bool,
}

type FetchFuture = BoxFuture<'static, Result<CacheValue, CacheError>>;
type SharedFetch = Shared<FetchFuture>;

/// Read-through cache over a [`QueryFetcher`].
///
/// Cheap to clone; all clones share the same entries, in-flight table,
/// and event channel.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    entries: moka::future::Cache<QueryKey, StoredEntry>,
    in_flight: DashMap<QueryKey, SharedFetch>,
    watchers: DashMap<QueryKey, usize>,
    events: broadcast::Sender<CacheEvent>,
    fetcher: Arc<dyn QueryFetcher>,
    stale_after: Duration,
    retry_limit: u32,
}

impl QueryCache {
    #[must_use]
    pub fn new(fetcher: Arc<dyn QueryFetcher>, config: &CacheConfig) -> Self {
        let entries = moka::future::Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_idle(ENTRY_IDLE_EVICTION)
            .build();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(QueryCacheInner {
                entries,
                in_flight: DashMap::new(),
                watchers: DashMap::new(),
                events,
                fetcher,
                stale_after: config.stale_after,
                retry_limit: config.retry_limit,
            }),
        }
    }

    /// Read a key with the default options.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fetch`] when the key is not cached and every
    /// fetch attempt fails.
    pub async fn read(&self, key: QueryKey) -> Result<CacheValue, CacheError> {
        self.read_with(key, ReadOptions::default()).await
    }

    /// Read a key, overriding staleness or retry behavior.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fetch`] when the key is not cached and every
    /// fetch attempt fails.
    #[instrument(skip(self, options), fields(key = %key))]
    pub async fn read_with(
        &self,
        key: QueryKey,
        options: ReadOptions,
    ) -> Result<CacheValue, CacheError> {
        let stale_after = options.stale_after.unwrap_or(self.inner.stale_after);
        let retry_limit = options.retry_limit.unwrap_or(self.inner.retry_limit);

        if let Some(entry) = self.inner.entries.get(&key).await {
            if !entry.stale && entry.fetched_at.elapsed() < stale_after {
                debug!("cache hit");
                return Ok(entry.value);
            }
            // Serve what we have and refresh behind the response.
            debug!("serving stale value while revalidating");
            self.revalidate(&key, retry_limit);
            return Ok(entry.value);
        }

        debug!("cache miss");
        self.ensure_fetch(&key, retry_limit).await
    }

    /// Mark one key stale and notify watchers.
    ///
    /// If a fetch for the key is already in flight, the invalidation
    /// coalesces into it instead of queueing another request. Watched keys
    /// are refetched eagerly; unwatched keys wait for their next reader.
    pub async fn invalidate_key(&self, key: &QueryKey) {
        let in_flight = self.inner.in_flight.contains_key(key);
        if !in_flight
            && let Some(entry) = self.inner.entries.get(key).await
            && !entry.stale
        {
            self.inner
                .entries
                .insert(
                    key.clone(),
                    StoredEntry {
                        stale: true,
                        ..entry
                    },
                )
                .await;
        }

        self.inner.emit(CacheEvent::Invalidated { key: key.clone() });

        if self.inner.watched(key) {
            self.revalidate(key, self.inner.retry_limit);
        }
    }

    /// Mark every cached or watched key in a family stale.
    #[instrument(skip(self), fields(family = %family))]
    pub async fn invalidate_family(&self, family: ResourceFamily) {
        let mut keys: Vec<QueryKey> = Vec::new();
        for (key, _) in self.inner.entries.iter() {
            if key.family() == family {
                keys.push((*key).clone());
            }
        }
        for watched in self.inner.watchers.iter() {
            if watched.key().family() == family && !keys.contains(watched.key()) {
                keys.push(watched.key().clone());
            }
        }

        debug!(keys = keys.len(), "invalidating family");
        for key in keys {
            self.invalidate_key(&key).await;
        }
    }

    /// Invalidate several families, in order.
    pub async fn invalidate_families(&self, families: &[ResourceFamily]) {
        for family in families {
            self.invalidate_family(*family).await;
        }
    }

    /// Invalidate whatever a backend table change could affect.
    ///
    /// Driven by the realtime listener; unknown tables are ignored.
    pub async fn invalidate_table(&self, table: &str) {
        let families = families_for_table(table);
        if families.is_empty() {
            debug!(table, "change notice for untracked table");
            return;
        }
        self.invalidate_families(families).await;
    }

    /// Subscribe to change notices for one key.
    ///
    /// While at least one watcher exists, invalidations of the key trigger
    /// an eager refetch so the next notice carries fresh data. Dropping
    /// the watcher unsubscribes.
    #[must_use]
    pub fn watch(&self, key: QueryKey) -> QueryWatcher {
        self.inner
            .watchers
            .entry(key.clone())
            .and_modify(|count| *count += 1)
            .or_insert(1);

        QueryWatcher {
            key,
            events: self.inner.events.subscribe(),
            cache: Arc::clone(&self.inner),
        }
    }

    /// Kick off a background refresh without waiting on it.
    fn revalidate(&self, key: &QueryKey, retry_limit: u32) {
        let shared = self.ensure_fetch(key, retry_limit);
        // The driver task spawned with the fetch keeps it running.
        drop(shared);
    }

    /// One fetch per key: join the in-flight future when present,
    /// otherwise start (and drive) a new one.
    fn ensure_fetch(&self, key: &QueryKey, retry_limit: u32) -> SharedFetch {
        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(slot) => slot.get().clone(),
            Entry::Vacant(slot) => {
                let shared = self.spawn_fetch(key.clone(), retry_limit);
                slot.insert(shared.clone());
                shared
            }
        }
    }

    fn spawn_fetch(&self, key: QueryKey, retry_limit: u32) -> SharedFetch {
        let inner = Arc::clone(&self.inner);
        let future: FetchFuture = Box::pin(async move {
            let result = inner.fetch_with_retry(&key, retry_limit).await;
            match result {
                Ok(value) => {
                    // Store before deregistering so readers always see
                    // either the in-flight fetch or the fresh entry.
                    inner
                        .entries
                        .insert(
                            key.clone(),
                            StoredEntry {
                                value: value.clone(),
                                fetched_at: Instant::now(),
                                stale: false,
                            },
                        )
                        .await;
                    inner.in_flight.remove(&key);
                    inner.emit(CacheEvent::Refreshed { key });
                    Ok(value)
                }
                Err(error) => {
                    inner.in_flight.remove(&key);
                    inner.emit(CacheEvent::RefreshFailed { key });
                    Err(error)
                }
            }
        });

        let shared = future.shared();
        // Drive the fetch to completion even if every reader drops.
        tokio::spawn({
            let shared = shared.clone();
            async move {
                let _ = shared.await;
            }
        });
        shared
    }
}

impl QueryCacheInner {
    async fn fetch_with_retry(
        &self,
        key: &QueryKey,
        retry_limit: u32,
    ) -> Result<CacheValue, CacheError> {
        let attempts = retry_limit.saturating_add(1);
        let mut message = String::new();

        for attempt in 1..=attempts {
            match self.fetcher.fetch(key).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!(key = %key, attempt, error = %error, "query fetch failed");
                    message = error.to_string();
                }
            }
        }

        Err(CacheError::Fetch {
            key: key.to_string(),
            attempts,
            message,
        })
    }

    fn watched(&self, key: &QueryKey) -> bool {
        self.watchers.get(key).is_some_and(|count| *count > 0)
    }

    fn emit(&self, event: CacheEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

/// A subscription to one key's change notices.
pub struct QueryWatcher {
    key: QueryKey,
    events: broadcast::Receiver<CacheEvent>,
    cache: Arc<QueryCacheInner>,
}

impl QueryWatcher {
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Wait for the next event concerning this key.
    ///
    /// Returns `None` if the cache has shut down. If the watcher fell
    /// behind the event channel, a synthetic [`CacheEvent::Invalidated`]
    /// is returned so consumers resync instead of missing changes.
    pub async fn next_event(&mut self) -> Option<CacheEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.key() == &self.key => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(key = %self.key, skipped, "watcher lagged behind cache events");
                    return Some(CacheEvent::Invalidated {
                        key: self.key.clone(),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for QueryWatcher {
    fn drop(&mut self) {
        if let Entry::Occupied(mut slot) = self.cache.watchers.entry(self.key.clone()) {
            if *slot.get() <= 1 {
                slot.remove();
            } else {
                *slot.get_mut() -= 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use plateful_core::ChannelId;

    use crate::supabase::SupabaseError;
    use crate::supabase::records::CommunityChannel;

    use super::*;

    struct TestFetcher {
        calls: AtomicU32,
        failures_remaining: AtomicU32,
        delay: Option<Duration>,
    }

    impl TestFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failures_remaining: AtomicU32::new(0),
                delay: None,
            })
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failures_remaining: AtomicU32::new(0),
                delay: Some(delay),
            })
        }

        fn fail_next(&self, count: u32) {
            self.failures_remaining.store(count, Ordering::SeqCst);
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl QueryFetcher for TestFetcher {
        async fn fetch(&self, _key: &QueryKey) -> Result<CacheValue, SupabaseError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let should_fail = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if should_fail {
                return Err(SupabaseError::Api {
                    status: 500,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(channels_tagged(call))
        }
    }

    fn channels_tagged(call: u32) -> CacheValue {
        CacheValue::Channels(vec![CommunityChannel {
            id: ChannelId::new(),
            name: format!("fetch-{call}"),
            description: None,
            category: "general".to_string(),
        }])
    }

    fn tag_of(value: &CacheValue) -> String {
        match value {
            CacheValue::Channels(channels) => {
                channels.first().map(|c| c.name.clone()).unwrap_or_default()
            }
            other => panic!("unexpected variant {}", other.kind()),
        }
    }

    fn cache_over(fetcher: Arc<TestFetcher>) -> QueryCache {
        QueryCache::new(fetcher, &CacheConfig::default())
    }

    fn key() -> QueryKey {
        QueryKey::Channels
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_hit_skips_refetch() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        let first = cache.read(key()).await.unwrap();
        let second = cache.read(key()).await.unwrap();

        assert_eq!(tag_of(&first), "fetch-1");
        assert_eq!(tag_of(&second), "fetch-1");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_fetch() {
        let fetcher = TestFetcher::with_delay(Duration::from_millis(50));
        let cache = cache_over(Arc::clone(&fetcher));

        let (a, b) = tokio::join!(cache.read(key()), cache.read(key()));

        assert_eq!(tag_of(&a.unwrap()), "fetch-1");
        assert_eq!(tag_of(&b.unwrap()), "fetch-1");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entry_serves_old_value_then_revalidates() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;

        let stale = cache.read(key()).await.unwrap();
        assert_eq!(tag_of(&stale), "fetch-1");

        settle().await;
        let refreshed = cache.read(key()).await.unwrap();
        assert_eq!(tag_of(&refreshed), "fetch-2");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_stale_time_always_revalidates() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));
        let options = ReadOptions {
            stale_after: Some(Duration::ZERO),
            retry_limit: None,
        };

        cache.read_with(key(), options).await.unwrap();
        settle().await;
        cache.read_with(key(), options).await.unwrap();
        settle().await;

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let fetcher = TestFetcher::new();
        fetcher.fail_next(1);
        let cache = cache_over(Arc::clone(&fetcher));

        let value = cache.read(key()).await.unwrap();

        assert_eq!(tag_of(&value), "fetch-2");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_bound_is_respected_and_failures_cache_nothing() {
        let fetcher = TestFetcher::new();
        fetcher.fail_next(u32::MAX);
        let cache = cache_over(Arc::clone(&fetcher));

        let error = cache.read(key()).await.unwrap_err();
        assert!(matches!(error, CacheError::Fetch { attempts: 2, .. }));
        assert_eq!(fetcher.calls(), 2);

        // Nothing was cached, so the next read fetches again.
        let error = cache.read(key()).await.unwrap_err();
        assert!(matches!(error, CacheError::Fetch { attempts: 2, .. }));
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_without_watchers_marks_stale_only() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        cache.invalidate_key(&key()).await;
        settle().await;
        assert_eq!(fetcher.calls(), 1, "no eager refetch without watchers");

        // The next read serves the stale value and revalidates.
        let served = cache.read(key()).await.unwrap();
        assert_eq!(tag_of(&served), "fetch-1");
        settle().await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_refetches_watched_keys_eagerly() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        let mut watcher = cache.watch(key());

        cache.invalidate_key(&key()).await;
        settle().await;
        assert_eq!(fetcher.calls(), 2);

        assert_eq!(
            watcher.next_event().await,
            Some(CacheEvent::Invalidated { key: key() })
        );
        assert_eq!(
            watcher.next_event().await,
            Some(CacheEvent::Refreshed { key: key() })
        );

        let value = cache.read(key()).await.unwrap();
        assert_eq!(tag_of(&value), "fetch-2");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_invalidations_coalesce_into_one_refetch() {
        let fetcher = TestFetcher::with_delay(Duration::from_millis(50));
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        let _watcher = cache.watch(key());

        cache.invalidate_key(&key()).await;
        cache.invalidate_key(&key()).await;
        cache.invalidate_key(&key()).await;
        settle().await;

        assert_eq!(fetcher.calls(), 2, "initial read plus one refetch");
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_during_inflight_fetch_coalesces() {
        let fetcher = TestFetcher::with_delay(Duration::from_millis(50));
        let cache = cache_over(Arc::clone(&fetcher));

        let reader = tokio::spawn({
            let cache = cache.clone();
            async move { cache.read(key()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.invalidate_key(&key()).await;
        let value = reader.await.unwrap().unwrap();

        assert_eq!(tag_of(&value), "fetch-1");
        assert_eq!(fetcher.calls(), 1);

        // The coalesced result landed fresh; no new fetch on read.
        cache.read(key()).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_watcher_stops_eager_refetches() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        let watcher = cache.watch(key());
        drop(watcher);

        cache.invalidate_key(&key()).await;
        settle().await;

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_watchers_keep_a_key_eager() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        let first = cache.watch(key());
        let _second = cache.watch(key());
        drop(first);

        cache.invalidate_key(&key()).await;
        settle().await;

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn family_invalidation_covers_cached_keys() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        cache.read(QueryKey::GroceryStores).await.unwrap();
        assert_eq!(fetcher.calls(), 2);

        cache.invalidate_family(ResourceFamily::Channels).await;
        settle().await;
        assert_eq!(fetcher.calls(), 2, "unwatched invalidation is lazy");

        // Channels went stale; grocery stores did not.
        cache.read(key()).await.unwrap();
        settle().await;
        assert_eq!(fetcher.calls(), 3);
        cache.read(QueryKey::GroceryStores).await.unwrap();
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_serving_the_stale_value() {
        let fetcher = TestFetcher::new();
        let cache = cache_over(Arc::clone(&fetcher));

        cache.read(key()).await.unwrap();
        let mut watcher = cache.watch(key());

        fetcher.fail_next(2);
        cache.invalidate_key(&key()).await;
        settle().await;

        assert_eq!(
            watcher.next_event().await,
            Some(CacheEvent::Invalidated { key: key() })
        );
        assert_eq!(
            watcher.next_event().await,
            Some(CacheEvent::RefreshFailed { key: key() })
        );

        let served = cache.read(key()).await.unwrap();
        assert_eq!(tag_of(&served), "fetch-1");
    }
}
