//! Session resolution: access token to identity and role.
//!
//! Every guarded request resolves the session's access token into an
//! [`Identity`] (user id, email, role). Resolution hits the auth endpoint
//! and the profiles table, so successful results are cached briefly per
//! token. Auth events (sign-in, sign-out) clear the whole cache; the next
//! request re-resolves from scratch rather than patching cached state.
//!
//! Resolution fails closed: any provider failure, a missing profile, or a
//! profile without a role all resolve to [`SessionState::Unauthenticated`].
//! A transient backend error can therefore bounce a signed-in user to the
//! sign-in page, but it can never grant access.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use plateful_core::{Email, UserId};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use crate::error::AppError;
use crate::models::{Identity, SessionState, session::keys};
use crate::supabase::records::Profile;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Resolved identities are reused for this long before re-checking the
/// token against the provider.
const IDENTITY_TTL: Duration = Duration::from_secs(60);

const MAX_CACHED_IDENTITIES: u64 = 10_000;

const AUTH_EVENT_CAPACITY: usize = 16;

/// A sign-in or sign-out somewhere in the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: UserId },
    SignedOut { user_id: UserId },
}

/// Broadcast channel for [`AuthEvent`]s.
///
/// Auth routes emit events after the provider confirms the change; the
/// session resolver subscribes and drops its cached identities on every
/// event.
#[derive(Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: AuthEvent) {
        // Nobody listening is fine.
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves sessions to identities, with a short-lived cache.
///
/// Cheap to clone; all clones share the cache and the event listener.
#[derive(Clone)]
pub struct SessionResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    /// Anonymous-key client; user lookups carry the session's bearer token.
    anon: SupabaseClient,
    /// Service-role client for profile reads.
    service: SupabaseClient,
    identities: moka::future::Cache<String, Identity>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionResolver {
    /// Create a resolver and subscribe it to auth events.
    ///
    /// The listener task is aborted when the last resolver clone drops.
    #[must_use]
    pub fn new(anon: SupabaseClient, service: SupabaseClient, events: &AuthEvents) -> Self {
        let identities = moka::future::Cache::builder()
            .max_capacity(MAX_CACHED_IDENTITIES)
            .time_to_live(IDENTITY_TTL)
            .build();

        let listener = spawn_listener(events.subscribe(), identities.clone());

        Self {
            inner: Arc::new(ResolverInner {
                anon,
                service,
                identities,
                listener: Mutex::new(Some(listener)),
            }),
        }
    }

    /// Resolve the current session to an authentication state.
    ///
    /// # Errors
    ///
    /// Returns an error only when the session store itself fails; provider
    /// and profile failures resolve to `Unauthenticated` instead.
    #[instrument(skip(self, session))]
    pub async fn resolve(&self, session: &Session) -> Result<SessionState, AppError> {
        let Some(token) = session.get::<String>(keys::ACCESS_TOKEN).await? else {
            return Ok(SessionState::Unauthenticated);
        };

        if let Some(identity) = self.inner.identities.get(&token).await {
            debug!(user_id = %identity.id, "resolved identity from cache");
            return Ok(SessionState::Authenticated(identity));
        }

        match self.resolve_from_provider(&token).await {
            Ok(Some(identity)) => {
                self.inner.identities.insert(token, identity.clone()).await;
                Ok(SessionState::Authenticated(identity))
            }
            Ok(None) => Ok(SessionState::Unauthenticated),
            Err(error) => {
                warn!(error = %error, "session resolution failed; treating as unauthenticated");
                Ok(SessionState::Unauthenticated)
            }
        }
    }

    /// Check the token against the provider and load the profile role.
    ///
    /// `Ok(None)` means the token or profile is unusable in a way that
    /// will not heal (revoked token, missing profile, no role).
    async fn resolve_from_provider(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, SupabaseError> {
        let user = match self.inner.anon.auth().get_user(token).await {
            Ok(user) => user,
            Err(error) if error.is_unauthorized() => {
                debug!("access token rejected by provider");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let profile: Option<Profile> = self
            .inner
            .service
            .table("profiles")
            .eq("id", user.id)
            .fetch_optional()
            .await?;

        let Some(profile) = profile else {
            warn!(user_id = %user.id, "authenticated user has no profile");
            return Ok(None);
        };
        let Some(role) = profile.user_type else {
            warn!(user_id = %user.id, "profile has no role");
            return Ok(None);
        };
        let email = match Email::parse(&profile.email) {
            Ok(email) => email,
            Err(error) => {
                warn!(user_id = %user.id, error = %error, "profile email is malformed");
                return Ok(None);
            }
        };

        Ok(Some(Identity {
            id: profile.id,
            email,
            role,
        }))
    }
}

impl Drop for ResolverInner {
    fn drop(&mut self) {
        // Take so the abort happens at most once.
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

/// Listen for auth events and clear cached identities on each one.
///
/// The task owns only the cache handle and the receiver, so it keeps no
/// reference back to the resolver.
fn spawn_listener(
    mut events: broadcast::Receiver<AuthEvent>,
    identities: moka::future::Cache<String, Identity>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    debug!(?event, "auth event; clearing resolved identities");
                    identities.invalidate_all();
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "auth event listener lagged; clearing anyway");
                    identities.invalidate_all();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use tower_sessions::MemoryStore;

    use crate::config::SupabaseConfig;

    use super::*;

    fn unreachable_clients() -> (SupabaseClient, SupabaseClient) {
        let config = SupabaseConfig {
            // Port 1 refuses connections, so provider calls fail fast.
            url: url::Url::parse("http://127.0.0.1:1").unwrap(),
            anon_key: "test-anon-key".to_string(),
            service_role_key: SecretString::from("test-service-key"),
        };
        (
            SupabaseClient::new(&config),
            SupabaseClient::with_service_role(&config),
        )
    }

    fn empty_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn resolves_missing_token_to_unauthenticated() {
        let (anon, service) = unreachable_clients();
        let resolver = SessionResolver::new(anon, service, &AuthEvents::new());

        let state = resolver.resolve(&empty_session()).await.unwrap();

        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn provider_failure_fails_closed() {
        let (anon, service) = unreachable_clients();
        let resolver = SessionResolver::new(anon, service, &AuthEvents::new());

        let session = empty_session();
        session
            .insert(keys::ACCESS_TOKEN, "some-access-token")
            .await
            .unwrap();

        let state = resolver.resolve(&session).await.unwrap();

        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn auth_events_reach_subscribers() {
        let events = AuthEvents::new();
        let mut receiver = events.subscribe();

        let user_id = UserId::new();
        events.emit(AuthEvent::SignedIn { user_id });

        assert_eq!(
            receiver.recv().await.unwrap(),
            AuthEvent::SignedIn { user_id }
        );
    }
}
