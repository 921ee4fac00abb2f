//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{QueryCache, SupabaseFetcher};
use crate::config::AppConfig;
use crate::services::{AuthEvents, Mutations, SessionResolver};
use crate::supabase::SupabaseClient;

/// Tables whose committed changes invalidate cached queries.
const REALTIME_TABLES: &[&str] = &[
    "posts",
    "likes",
    "comments",
    "community_posts",
    "orders",
    "reservations",
];

const INITIAL_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the platform clients, the query cache, and
/// configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    supabase: SupabaseClient,
    queries: QueryCache,
    sessions: SessionResolver,
    auth_events: AuthEvents,
    mutations: Mutations,
    realtime_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for AppStateInner {
    fn drop(&mut self) {
        // Take so the abort happens at most once.
        if let Some(task) = self.realtime_task.lock().take() {
            task.abort();
        }
    }
}

impl AppState {
    /// Create a new application state.
    ///
    /// Reads go through a service-role client behind the query cache; the
    /// route guards scope what each user may see. Writes go through the
    /// anonymous client and carry the user's own access token, so row
    /// policies apply to the actual user.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let supabase = SupabaseClient::new(&config.supabase);
        let service = SupabaseClient::with_service_role(&config.supabase);

        let auth_events = AuthEvents::new();
        let queries = QueryCache::new(Arc::new(SupabaseFetcher::new(service.clone())), &config.cache);
        let sessions = SessionResolver::new(supabase.clone(), service, &auth_events);
        let mutations = Mutations::new(supabase.clone(), queries.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                queries,
                sessions,
                auth_events,
                mutations,
                realtime_task: Mutex::new(None),
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the anonymous-key platform client (auth, functions, realtime).
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Get the shared query cache.
    #[must_use]
    pub fn queries(&self) -> &QueryCache {
        &self.inner.queries
    }

    /// Get the session resolver.
    #[must_use]
    pub fn sessions(&self) -> &SessionResolver {
        &self.inner.sessions
    }

    /// Get the auth event bus.
    #[must_use]
    pub fn auth_events(&self) -> &AuthEvents {
        &self.inner.auth_events
    }

    /// Get the write-side service.
    #[must_use]
    pub fn mutations(&self) -> &Mutations {
        &self.inner.mutations
    }

    /// Start the background task that turns committed platform changes
    /// into cache invalidations. Idempotent: a second call replaces the
    /// previous task.
    ///
    /// The task captures only the clients it reads through, never the
    /// state itself: the state owns the task's abort handle, so it must
    /// outlive the task, not the other way around.
    pub fn start_realtime_invalidation(&self) {
        let supabase = self.inner.supabase.clone();
        let queries = self.inner.queries.clone();
        let task = tokio::spawn(realtime_invalidation_loop(supabase, queries));
        if let Some(previous) = self.inner.realtime_task.lock().replace(task) {
            previous.abort();
        }
    }
}

async fn realtime_invalidation_loop(supabase: SupabaseClient, queries: QueryCache) {
    let mut backoff = INITIAL_RECONNECT_BACKOFF;
    loop {
        match supabase.realtime().subscribe(REALTIME_TABLES).await {
            Ok(mut feed) => {
                info!(tables = ?REALTIME_TABLES, "change feed connected");
                backoff = INITIAL_RECONNECT_BACKOFF;
                loop {
                    match feed.next_change().await {
                        Ok(Some(event)) => {
                            queries.invalidate_table(&event.table).await;
                        }
                        Ok(None) => {
                            warn!("change feed closed, reconnecting");
                            break;
                        }
                        Err(error) => {
                            warn!(%error, "change feed failed, reconnecting");
                            break;
                        }
                    }
                }
            }
            Err(error) => warn!(%error, "change feed connection failed"),
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_RECONNECT_BACKOFF);
    }
}
