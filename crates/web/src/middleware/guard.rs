//! Role-based route guards.
//!
//! Protected pages never render while authentication is unknown: the
//! extractors resolve the session first and either hand the handler a
//! verified identity or redirect. Signed-out visitors go to the sign-in
//! page; signed-in visitors on the wrong side of the app go to their own
//! role's home.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::Role;
use tower_sessions::Session;
use tracing::warn;

use crate::error::AppError;
use crate::models::{session::keys, Identity, SessionState};
use crate::state::AppState;

/// Where a protected request is sent, given the required role and the
/// resolved one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the page.
    Allow,
    /// No identity: sign in first.
    RedirectToSignIn,
    /// Signed in as the other role: go to that role's home.
    RedirectToHome(Role),
}

impl GuardOutcome {
    #[must_use]
    pub fn evaluate(required: Role, resolved: Option<Role>) -> Self {
        match resolved {
            None => Self::RedirectToSignIn,
            Some(role) if role == required => Self::Allow,
            Some(other) => Self::RedirectToHome(other),
        }
    }
}

/// Landing page for a role after sign-in or a wrong-role redirect.
#[must_use]
pub const fn home_path(role: Role) -> &'static str {
    match role {
        Role::RestaurantOwner => "/dashboard",
        Role::Customer => "/customer/home",
    }
}

fn sign_in_path(audience: Role) -> String {
    format!("/auth?mode=sign-in&type={}", audience.as_str())
}

/// A verified user plus the access token their writes must carry.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub token: String,
}

/// Rejection produced by the guard extractors.
pub enum GuardRejection {
    SignIn(Role),
    Home(Role),
    Failure(AppError),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::SignIn(audience) => Redirect::to(&sign_in_path(audience)).into_response(),
            Self::Home(role) => Redirect::to(home_path(role)).into_response(),
            Self::Failure(error) => error.into_response(),
        }
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    required: Role,
) -> Result<CurrentUser, GuardRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(GuardRejection::SignIn(required))?;

    let resolved = state
        .sessions()
        .resolve(&session)
        .await
        .map_err(GuardRejection::Failure)?;

    match GuardOutcome::evaluate(required, resolved.role()) {
        GuardOutcome::Allow => {}
        GuardOutcome::RedirectToSignIn => return Err(GuardRejection::SignIn(required)),
        GuardOutcome::RedirectToHome(actual) => return Err(GuardRejection::Home(actual)),
    }

    let SessionState::Authenticated(identity) = resolved else {
        return Err(GuardRejection::SignIn(required));
    };
    let token: Option<String> = session
        .get(keys::ACCESS_TOKEN)
        .await
        .map_err(|err| GuardRejection::Failure(err.into()))?;
    let token = token.ok_or(GuardRejection::SignIn(required))?;

    Ok(CurrentUser { identity, token })
}

/// Extractor for restaurant dashboard pages.
pub struct RequireOwner(pub CurrentUser);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::RestaurantOwner)
            .await
            .map(Self)
    }
}

/// Extractor for the customer-facing app.
pub struct RequireCustomer(pub CurrentUser);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Customer).await.map(Self)
    }
}

/// Extractor for public pages that adapt to a signed-in visitor.
///
/// Never rejects: resolution failures degrade to an anonymous view.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self(None));
        };

        let identity = match state.sessions().resolve(&session).await {
            Ok(SessionState::Authenticated(identity)) => Some(identity),
            Ok(SessionState::Unauthenticated) => None,
            Err(error) => {
                warn!(%error, "session resolution failed on a public page");
                None
            }
        };

        Ok(Self(identity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_visitors_are_sent_to_sign_in() {
        assert_eq!(
            GuardOutcome::evaluate(Role::RestaurantOwner, None),
            GuardOutcome::RedirectToSignIn
        );
        assert_eq!(
            GuardOutcome::evaluate(Role::Customer, None),
            GuardOutcome::RedirectToSignIn
        );
    }

    #[test]
    fn matching_roles_are_allowed() {
        assert_eq!(
            GuardOutcome::evaluate(Role::RestaurantOwner, Some(Role::RestaurantOwner)),
            GuardOutcome::Allow
        );
        assert_eq!(
            GuardOutcome::evaluate(Role::Customer, Some(Role::Customer)),
            GuardOutcome::Allow
        );
    }

    #[test]
    fn mismatched_roles_go_to_their_own_home() {
        assert_eq!(
            GuardOutcome::evaluate(Role::RestaurantOwner, Some(Role::Customer)),
            GuardOutcome::RedirectToHome(Role::Customer)
        );
        assert_eq!(
            GuardOutcome::evaluate(Role::Customer, Some(Role::RestaurantOwner)),
            GuardOutcome::RedirectToHome(Role::RestaurantOwner)
        );
    }

    #[test]
    fn home_paths_differ_per_role() {
        assert_eq!(home_path(Role::RestaurantOwner), "/dashboard");
        assert_eq!(home_path(Role::Customer), "/customer/home");
    }

    #[test]
    fn sign_in_path_carries_the_audience() {
        assert_eq!(
            sign_in_path(Role::RestaurantOwner),
            "/auth?mode=sign-in&type=restaurant_owner"
        );
        assert_eq!(sign_in_path(Role::Customer), "/auth?mode=sign-in&type=customer");
    }
}
