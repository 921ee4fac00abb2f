//! Pages that exist in the navigation but are not built out yet.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireCustomer;

use super::CustomerNav;

/// Shared "coming soon" template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/placeholder.html")]
pub struct PlaceholderTemplate {
    pub nav: CustomerNav,
    pub title: &'static str,
    pub description: &'static str,
}

/// Saved restaurants and posts.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn favorites(RequireCustomer(user): RequireCustomer) -> Response {
    PlaceholderTemplate {
        nav: CustomerNav::new(&user.identity, "favorites"),
        title: "Favorites",
        description: "Soon you will be able to save restaurants and posts you love.",
    }
    .into_response()
}

/// Direct messages.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn messages(RequireCustomer(user): RequireCustomer) -> Response {
    PlaceholderTemplate {
        nav: CustomerNav::new(&user.identity, "messages"),
        title: "Messages",
        description: "Direct messages between food lovers are on the way.",
    }
    .into_response()
}

/// Activity notifications.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn notifications(RequireCustomer(user): RequireCustomer) -> Response {
    PlaceholderTemplate {
        nav: CustomerNav::new(&user.identity, "notifications"),
        title: "Notifications",
        description: "Likes, comments, and reservation updates will show up here.",
    }
    .into_response()
}
