//! Social feed: tabs, post composer, and live updates.
//!
//! The page renders from the cache. A small event stream tells the browser
//! when the cached feed changes underneath it (another user posted, a
//! realtime notice arrived); the page then reloads just the feed fragment.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, stream};
use plateful_core::FeedKind;
use serde::Deserialize;
use tracing::instrument;

use crate::cache::CacheEvent;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::models::Identity;
use crate::state::AppState;
use crate::supabase::records::Post;

use super::{CustomerNav, feed_key};

/// Feed query parameters: the active tab plus the post-composer flash.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub tab: Option<String>,
    pub success: Option<String>,
}

fn parse_tab(raw: Option<&str>) -> FeedKind {
    raw.and_then(|raw| raw.parse().ok()).unwrap_or_default()
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/home.html")]
pub struct HomeTemplate {
    pub nav: CustomerNav,
    pub tabs: &'static [FeedKind],
    pub active_tab: FeedKind,
    pub posts: Vec<Post>,
    /// Preserved composer values plus the validation error, if any.
    pub post_content: String,
    pub post_image_url: String,
    pub post_error: Option<String>,
    pub success: Option<&'static str>,
}

/// Feed fragment, rendered standalone for live reloads and included by
/// the full page.
#[derive(Template, WebTemplate)]
#[template(path = "customer/feed.html")]
pub struct FeedTemplate {
    pub active_tab: FeedKind,
    pub posts: Vec<Post>,
}

pub(crate) async fn home_template(
    state: &AppState,
    identity: &Identity,
    tab: FeedKind,
) -> Result<HomeTemplate, AppError> {
    let posts = state
        .queries()
        .read(feed_key(tab, identity.id))
        .await?
        .into_posts()?;

    Ok(HomeTemplate {
        nav: CustomerNav::new(identity, "home"),
        tabs: &FeedKind::ALL,
        active_tab: tab,
        posts,
        post_content: String::new(),
        post_image_url: String::new(),
        post_error: None,
        success: None,
    })
}

/// Display the social feed.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn home(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, AppError> {
    let tab = parse_tab(query.tab.as_deref());
    let mut page = home_template(&state, &user.identity, tab).await?;
    if query.success.as_deref() == Some("posted") {
        page.success = Some("Your post is live.");
    }
    Ok(page.into_response())
}

/// Serve just the feed list, for in-place reloads.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn feed_fragment(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, AppError> {
    let tab = parse_tab(query.tab.as_deref());
    let posts = state
        .queries()
        .read(feed_key(tab, user.identity.id))
        .await?
        .into_posts()?;

    Ok(FeedTemplate {
        active_tab: tab,
        posts,
    }
    .into_response())
}

/// Event stream for the active feed tab.
///
/// Emits one `cache` event per state change; the payload names what
/// happened. The browser refetches the fragment on `refreshed`, which is
/// the only transition with new data to show.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn feed_events(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let tab = parse_tab(query.tab.as_deref());
    let watcher = state.queries().watch(feed_key(tab, user.identity.id));

    let events = stream::unfold(watcher, |mut watcher| async move {
        let event = watcher.next_event().await?;
        let name = match event {
            CacheEvent::Invalidated { .. } => "invalidated",
            CacheEvent::Refreshed { .. } => "refreshed",
            CacheEvent::RefreshFailed { .. } => "refresh-failed",
        };
        Some((Ok(Event::default().event("cache").data(name)), watcher))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
