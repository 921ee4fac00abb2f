//! Authentication route handlers.
//!
//! Sign-in and sign-up run against the platform's auth service; the only
//! thing kept locally is the issued access token inside the session
//! cookie. Role membership comes from the user's profile row, resolved
//! per request by the session resolver.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::Role;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::filters;
use crate::middleware::home_path;
use crate::models::{SessionState, session::keys};
use crate::services::AuthEvent;
use crate::state::AppState;
use crate::supabase::{AuthError, SignUpOutcome};

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub user_type: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the auth page.
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Auth page template (sign-in and sign-up tabs).
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    /// Active tab: `sign-in` or `sign-up`.
    pub mode: String,
    /// Preselected audience: `customer` or `restaurant_owner`.
    pub user_type: String,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
    /// Email preserved across a failed attempt.
    pub email: String,
}

fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "email_taken" => "An account with this email already exists.",
        "weak_password" => "That password is too weak. Use at least 8 characters.",
        "unconfirmed" => "Confirm your email address before signing in.",
        "password_mismatch" => "The passwords do not match.",
        "password_too_short" => "Passwords must be at least 8 characters.",
        "invalid_email" => "Enter a valid email address.",
        "missing_name" => "Enter your name.",
        "invalid_role" => "Choose whether you are a customer or a restaurant owner.",
        "profile" => "Your account has no profile yet. Try again in a moment.",
        "session" => "Could not start a session. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

fn success_message(code: &str) -> Option<&'static str> {
    match code {
        "confirm_email" => Some("Check your inbox and confirm your email, then sign in."),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the sign-in / sign-up page.
///
/// Visitors who are already signed in are sent to their role's home.
pub async fn auth_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<AuthQuery>,
) -> Response {
    if let Ok(SessionState::Authenticated(identity)) = state.sessions().resolve(&session).await {
        return Redirect::to(home_path(identity.role)).into_response();
    }

    let mode = match query.mode.as_deref() {
        Some("sign-up") => "sign-up",
        _ => "sign-in",
    };
    let user_type = match query.user_type.as_deref() {
        Some("restaurant_owner") => "restaurant_owner",
        _ => "customer",
    };

    AuthTemplate {
        mode: mode.to_string(),
        user_type: user_type.to_string(),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().and_then(success_message),
        email: query.email.unwrap_or_default(),
    }
    .into_response()
}

fn sign_in_failure(code: &str, email: &str) -> Response {
    let target = format!(
        "/auth?mode=sign-in&error={code}&email={}",
        urlencoding::encode(email)
    );
    Redirect::to(&target).into_response()
}

fn sign_up_failure(code: &str, user_type: &str, email: &str) -> Response {
    let target = format!(
        "/auth?mode=sign-up&type={user_type}&error={code}&email={}",
        urlencoding::encode(email)
    );
    Redirect::to(&target).into_response()
}

const fn auth_error_code(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidCredentials => "credentials",
        AuthError::EmailTaken => "email_taken",
        AuthError::WeakPassword(_) => "weak_password",
        AuthError::EmailNotConfirmed => "unconfirmed",
        AuthError::Provider(_) => "provider",
    }
}

/// Handle sign-in form submission.
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Response {
    let email = form.email.trim();
    if plateful_core::Email::parse(email).is_err() {
        return sign_in_failure("invalid_email", email);
    }

    let issued = match state.supabase().auth().sign_in(email, &form.password).await {
        Ok(issued) => issued,
        Err(error) => {
            tracing::warn!(%error, "sign-in rejected");
            return sign_in_failure(auth_error_code(&error), email);
        }
    };

    if let Err(error) = session.insert(keys::ACCESS_TOKEN, &issued.access_token).await {
        tracing::error!(%error, "failed to store access token in session");
        return sign_in_failure("session", email);
    }

    state.auth_events().emit(AuthEvent::SignedIn {
        user_id: issued.user.id,
    });

    // Resolve the role now so the redirect lands on the right side of
    // the app. Resolution failure means no usable profile: fail closed.
    match state.sessions().resolve(&session).await {
        Ok(SessionState::Authenticated(identity)) => {
            set_sentry_user(&identity.id, issued.user.email.as_deref());
            Redirect::to(home_path(identity.role)).into_response()
        }
        Ok(SessionState::Unauthenticated) => {
            let _ = session.flush().await;
            sign_in_failure("profile", email)
        }
        Err(error) => {
            tracing::error!(%error, "session resolution failed after sign-in");
            let _ = session.flush().await;
            sign_in_failure("session", email)
        }
    }
}

/// Handle sign-up form submission.
///
/// The platform creates the profile row from the submitted metadata, so
/// a successful sign-up already has a role attached.
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Response {
    let email = form.email.trim();
    let full_name = form.full_name.trim();

    let Ok(role) = form.user_type.parse::<Role>() else {
        return sign_up_failure("invalid_role", &form.user_type, email);
    };
    let audience = role.as_str();

    if full_name.is_empty() {
        return sign_up_failure("missing_name", audience, email);
    }
    if plateful_core::Email::parse(email).is_err() {
        return sign_up_failure("invalid_email", audience, email);
    }
    if form.password != form.password_confirm {
        return sign_up_failure("password_mismatch", audience, email);
    }
    if form.password.len() < 8 {
        return sign_up_failure("password_too_short", audience, email);
    }

    let metadata = serde_json::json!({
        "full_name": full_name,
        "user_type": audience,
    });

    match state
        .supabase()
        .auth()
        .sign_up(email, &form.password, &metadata)
        .await
    {
        Ok(SignUpOutcome::SignedIn(issued)) => {
            if let Err(error) = session.insert(keys::ACCESS_TOKEN, &issued.access_token).await {
                tracing::error!(%error, "failed to store access token in session");
                return sign_up_failure("session", audience, email);
            }
            state.auth_events().emit(AuthEvent::SignedIn {
                user_id: issued.user.id,
            });
            set_sentry_user(&issued.user.id, issued.user.email.as_deref());
            Redirect::to(home_path(role)).into_response()
        }
        Ok(SignUpOutcome::ConfirmationRequired(_)) => {
            Redirect::to("/auth?mode=sign-in&success=confirm_email").into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "sign-up rejected");
            sign_up_failure(auth_error_code(&error), audience, email)
        }
    }
}

/// Handle sign-out.
///
/// Revokes the platform session (best effort), publishes the sign-out
/// event, and destroys the local session before returning to the landing
/// page.
pub async fn sign_out(State(state): State<AppState>, session: Session) -> Response {
    let signed_out_user = match state.sessions().resolve(&session).await {
        Ok(state) => state.identity().map(|identity| identity.id),
        Err(error) => {
            tracing::warn!(%error, "could not resolve identity during sign-out");
            None
        }
    };

    if let Ok(Some(token)) = session.get::<String>(keys::ACCESS_TOKEN).await {
        // Best effort: the local session is cleared regardless.
        if let Err(error) = state.supabase().auth().sign_out(&token).await {
            tracing::warn!(%error, "access token revocation failed");
        }
    }

    if let Some(user_id) = signed_out_user {
        state.auth_events().emit(AuthEvent::SignedOut { user_id });
    }

    if let Err(error) = session.flush().await {
        tracing::error!(%error, "failed to flush session");
    }
    crate::error::clear_sentry_user();

    Redirect::to("/").into_response()
}
