//! Profile and account settings pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::models::Identity;
use crate::models::session::keys;
use crate::services::MutationError;
use crate::state::AppState;
use crate::supabase::records::Profile;

use super::CustomerNav;

/// Flash query parameters.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub success: Option<String>,
}

/// Profile form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/profile.html")]
pub struct ProfileTemplate {
    pub nav: CustomerNav,
    pub profile: Profile,
    pub form: ProfileForm,
    pub error: Option<String>,
    pub success: Option<&'static str>,
}

/// Account settings template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/settings.html")]
pub struct SettingsTemplate {
    pub nav: CustomerNav,
    pub profile: Profile,
    pub joined_channel_count: usize,
}

async fn load_profile(state: &AppState, identity: &Identity) -> Result<Profile, AppError> {
    let profile = state
        .queries()
        .read(QueryKey::Profile { user: identity.id })
        .await?
        .into_profile()?;
    Ok(*profile)
}

/// Display the viewer's profile.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn profile_page(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Response, AppError> {
    let profile = load_profile(&state, &user.identity).await?;

    Ok(ProfileTemplate {
        nav: CustomerNav::new(&user.identity, "profile"),
        form: ProfileForm {
            full_name: profile.full_name.clone().unwrap_or_default(),
        },
        profile,
        error: None,
        success: match query.success.as_deref() {
            Some("saved") => Some("Profile saved."),
            _ => None,
        },
    }
    .into_response())
}

/// Update the viewer's display name.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn update_profile(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    match state
        .mutations()
        .update_profile(&user.token, &user.identity, &form.full_name)
        .await
    {
        Ok(()) => Ok(Redirect::to("/customer/profile?success=saved").into_response()),
        Err(MutationError::Invalid(message)) => {
            let profile = load_profile(&state, &user.identity).await?;
            Ok(ProfileTemplate {
                nav: CustomerNav::new(&user.identity, "profile"),
                profile,
                form,
                error: Some(message),
                success: None,
            }
            .into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "profile update failed");
            let profile = load_profile(&state, &user.identity).await?;
            Ok(ProfileTemplate {
                nav: CustomerNav::new(&user.identity, "profile"),
                profile,
                form,
                error: Some("Could not save changes. Please try again.".to_string()),
                success: None,
            }
            .into_response())
        }
    }
}

/// Display account settings.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn settings_page(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let profile = load_profile(&state, &user.identity).await?;
    let joined = session
        .get::<Vec<plateful_core::ChannelId>>(keys::JOINED_CHANNELS)
        .await?
        .unwrap_or_default();

    Ok(SettingsTemplate {
        nav: CustomerNav::new(&user.identity, "settings"),
        profile,
        joined_channel_count: joined.len(),
    }
    .into_response())
}
