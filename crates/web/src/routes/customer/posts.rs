//! Post composer, detail view, likes, and comments.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::{FeedKind, PostId};
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::models::Identity;
use crate::services::MutationError;
use crate::state::AppState;
use crate::supabase::records::{Comment, Post};

use super::{CustomerNav, feed_key, home::home_template};

const WRITE_FAILED: &str = "Could not save changes. Please try again.";

// =============================================================================
// Forms
// =============================================================================

/// Composer form posted from the feed page.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub content: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub tab: String,
}

/// Like toggle; `next` is the same-site path to return to.
#[derive(Debug, Deserialize)]
pub struct LikeForm {
    #[serde(default)]
    pub next: String,
}

/// Comment form posted from the detail page.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
    #[serde(default)]
    pub tab: String,
}

/// Detail page query: which feed tab the reader came from.
#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub tab: Option<String>,
}

fn parse_tab(raw: &str) -> FeedKind {
    raw.parse().unwrap_or_default()
}

// =============================================================================
// Detail Template
// =============================================================================

/// Post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/post.html")]
pub struct PostDetailTemplate {
    pub nav: CustomerNav,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub tab: FeedKind,
    pub comment_content: String,
    pub comment_error: Option<String>,
}

/// Build the detail page from the cached feed the reader navigated from.
/// A post that has fallen out of that feed is treated as gone.
async fn detail_template(
    state: &AppState,
    identity: &Identity,
    post_id: PostId,
    tab: FeedKind,
) -> Result<PostDetailTemplate, AppError> {
    let (posts, comments) = tokio::join!(
        state.queries().read(feed_key(tab, identity.id)),
        state.queries().read(QueryKey::Comments { post: post_id }),
    );

    let post = posts?
        .into_posts()?
        .into_iter()
        .find(|post| post.id == post_id)
        .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;

    Ok(PostDetailTemplate {
        nav: CustomerNav::new(identity, "home"),
        post,
        comments: comments?.into_comments()?,
        tab,
        comment_content: String::new(),
        comment_error: None,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Publish a post from the feed composer.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn create_post(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let image_url = form.image_url.trim();
    let image_url = (!image_url.is_empty()).then_some(image_url);

    match state
        .mutations()
        .create_post(&user.token, &user.identity, &form.content, image_url)
        .await
    {
        Ok(()) => Ok(Redirect::to("/customer/home?success=posted").into_response()),
        Err(MutationError::Invalid(message)) => {
            let mut page = home_template(&state, &user.identity, parse_tab(&form.tab)).await?;
            page.post_content = form.content;
            page.post_image_url = form.image_url;
            page.post_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "post insert failed");
            let mut page = home_template(&state, &user.identity, parse_tab(&form.tab)).await?;
            page.post_content = form.content;
            page.post_image_url = form.image_url;
            page.post_error = Some(WRITE_FAILED.to_string());
            Ok(page.into_response())
        }
    }
}

/// Display one post with its comments.
#[instrument(skip_all, fields(user = %user.identity.id, post = %post))]
pub async fn post_detail(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Path(post): Path<PostId>,
    Query(query): Query<DetailQuery>,
) -> Result<Response, AppError> {
    let tab = query.tab.as_deref().map(parse_tab).unwrap_or_default();
    let page = detail_template(&state, &user.identity, post, tab).await?;
    Ok(page.into_response())
}

/// Toggle the viewer's like on a post.
#[instrument(skip_all, fields(user = %user.identity.id, post = %post))]
pub async fn toggle_like(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Path(post): Path<PostId>,
    Form(form): Form<LikeForm>,
) -> Result<Response, AppError> {
    if let Err(error) = state
        .mutations()
        .toggle_like(&user.token, &user.identity, post)
        .await
    {
        tracing::error!(%error, "like toggle failed");
    }

    // Only same-site paths; anything else falls back to the feed.
    let next = if form.next.starts_with('/') && !form.next.starts_with("//") {
        form.next.as_str()
    } else {
        "/customer/home"
    };
    Ok(Redirect::to(next).into_response())
}

/// Add a comment from the detail page.
#[instrument(skip_all, fields(user = %user.identity.id, post = %post))]
pub async fn add_comment(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Path(post): Path<PostId>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let tab = parse_tab(&form.tab);

    match state
        .mutations()
        .add_comment(&user.token, &user.identity, post, &form.content)
        .await
    {
        Ok(()) => {
            let next = format!("/customer/posts/{post}?tab={}", tab.as_str());
            Ok(Redirect::to(&next).into_response())
        }
        Err(MutationError::Invalid(message)) => {
            let mut page = detail_template(&state, &user.identity, post, tab).await?;
            page.comment_content = form.content;
            page.comment_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "comment insert failed");
            let mut page = detail_template(&state, &user.identity, post, tab).await?;
            page.comment_content = form.content;
            page.comment_error = Some(WRITE_FAILED.to_string());
            Ok(page.into_response())
        }
    }
}
