//! Community channels and their discussion boards.
//!
//! Channel membership is a session-side bookmark list: joining tailors the
//! page, it does not write anything to the platform.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::ChannelId;
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
use crate::supabase::records::{CommunityChannel, CommunityPost};

use super::CustomerNav;

/// Flash query parameters.
#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    pub success: Option<String>,
}

/// New discussion form data.
#[derive(Debug, Default, Deserialize)]
pub struct CommunityPostForm {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

async fn joined_channels(session: &Session) -> Result<Vec<ChannelId>, AppError> {
    Ok(session
        .get::<Vec<ChannelId>>(keys::JOINED_CHANNELS)
        .await?
        .unwrap_or_default())
}

/// One channel row with the viewer's membership.
pub struct ChannelCard {
    pub channel: CommunityChannel,
    pub joined: bool,
}

/// Channel list template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/communities.html")]
pub struct ChannelsTemplate {
    pub nav: CustomerNav,
    pub channels: Vec<ChannelCard>,
}

/// Single channel template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/channel.html")]
pub struct ChannelTemplate {
    pub nav: CustomerNav,
    pub channel: CommunityChannel,
    pub posts: Vec<CommunityPost>,
    pub joined: bool,
    pub success: Option<&'static str>,
    pub form: CommunityPostForm,
    pub form_error: Option<String>,
}

async fn find_channel(state: &AppState, id: ChannelId) -> Result<CommunityChannel, AppError> {
    state
        .queries()
        .read(QueryKey::Channels)
        .await?
        .into_channels()?
        .into_iter()
        .find(|channel| channel.id == id)
        .ok_or_else(|| AppError::NotFound(format!("channel {id}")))
}

async fn channel_template(
    state: &AppState,
    identity: &Identity,
    session: &Session,
    id: ChannelId,
) -> Result<ChannelTemplate, AppError> {
    let (channel, posts, joined) = tokio::join!(
        find_channel(state, id),
        state.queries().read(QueryKey::ChannelPosts { channel: id }),
        joined_channels(session),
    );

    Ok(ChannelTemplate {
        nav: CustomerNav::new(identity, "communities"),
        channel: channel?,
        posts: posts?.into_community_posts()?,
        joined: joined?.contains(&id),
        success: None,
        form: CommunityPostForm::default(),
        form_error: None,
    })
}

/// List all community channels.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn channels(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let all = state
        .queries()
        .read(QueryKey::Channels)
        .await?
        .into_channels()?;
    let joined = joined_channels(&session).await?;

    Ok(ChannelsTemplate {
        nav: CustomerNav::new(&user.identity, "communities"),
        channels: all
            .into_iter()
            .map(|channel| ChannelCard {
                joined: joined.contains(&channel.id),
                channel,
            })
            .collect(),
    }
    .into_response())
}

/// Display one channel's discussions.
#[instrument(skip_all, fields(user = %user.identity.id, channel = %id))]
pub async fn channel(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ChannelId>,
    Query(query): Query<ChannelQuery>,
) -> Result<Response, AppError> {
    let mut page = channel_template(&state, &user.identity, &session, id).await?;
    if query.success.as_deref() == Some("posted") {
        page.success = Some("Your discussion is live.");
    }
    Ok(page.into_response())
}

/// Join a channel.
#[instrument(skip_all, fields(user = %user.identity.id, channel = %id))]
pub async fn join(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ChannelId>,
) -> Result<Response, AppError> {
    // Only known channels can be joined.
    find_channel(&state, id).await?;

    let mut joined = joined_channels(&session).await?;
    if !joined.contains(&id) {
        joined.push(id);
        session.insert(keys::JOINED_CHANNELS, &joined).await?;
    }

    Ok(Redirect::to(&format!("/customer/communities/{id}")).into_response())
}

/// Leave a channel.
#[instrument(skip_all, fields(user = %user.identity.id, channel = %id))]
pub async fn leave(
    RequireCustomer(user): RequireCustomer,
    session: Session,
    Path(id): Path<ChannelId>,
) -> Result<Response, AppError> {
    let mut joined = joined_channels(&session).await?;
    joined.retain(|channel| *channel != id);
    session.insert(keys::JOINED_CHANNELS, &joined).await?;

    Ok(Redirect::to("/customer/communities").into_response())
}

/// Start a discussion in a channel.
#[instrument(skip_all, fields(user = %user.identity.id, channel = %id))]
pub async fn create_post(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ChannelId>,
    Form(form): Form<CommunityPostForm>,
) -> Result<Response, AppError> {
    match state
        .mutations()
        .create_community_post(&user.token, &user.identity, id, &form.title, &form.content)
        .await
    {
        Ok(()) => {
            Ok(Redirect::to(&format!("/customer/communities/{id}?success=posted"))
                .into_response())
        }
        Err(MutationError::Invalid(message)) => {
            let mut page = channel_template(&state, &user.identity, &session, id).await?;
            page.form = form;
            page.form_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "community post insert failed");
            let mut page = channel_template(&state, &user.identity, &session, id).await?;
            page.form = form;
            page.form_error = Some("Could not save changes. Please try again.".to_string());
            Ok(page.into_response())
        }
    }
}
