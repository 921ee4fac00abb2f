//! Restaurant discovery with search, and per-restaurant feedback.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::RestaurantId;
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::services::MutationError;
use crate::state::AppState;
use crate::supabase::records::Restaurant;

use super::CustomerNav;

/// Search and flash query parameters.
#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub q: Option<String>,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Feedback form posted from one restaurant card; `q` carries the
/// search term back through the redirect.
#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub q: String,
    pub rating: String,
    #[serde(default)]
    pub comment: String,
}

/// Discovery page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/discover.html")]
pub struct DiscoverTemplate {
    pub nav: CustomerNav,
    pub restaurants: Vec<Restaurant>,
    pub query: String,
    pub success: Option<&'static str>,
    pub error: Option<&'static str>,
}

/// Browse or search restaurants.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn discover(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Result<Response, AppError> {
    let term = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty());

    let restaurants = state
        .queries()
        .read(QueryKey::Restaurants {
            search: term.map(str::to_string),
        })
        .await?
        .into_restaurants()?;

    Ok(DiscoverTemplate {
        nav: CustomerNav::new(&user.identity, "discover"),
        restaurants,
        query: term.unwrap_or_default().to_string(),
        success: match query.success.as_deref() {
            Some("feedback") => Some("Thanks, your feedback was sent."),
            _ => None,
        },
        error: match query.error.as_deref() {
            Some("rating") => Some("Choose a rating from 1 to 5."),
            Some("write_failed") => Some("Could not send your feedback. Please try again."),
            _ => None,
        },
    }
    .into_response())
}

/// Leave a rating and optional comment for a restaurant.
#[instrument(skip_all, fields(user = %user.identity.id, restaurant = %restaurant))]
pub async fn submit_feedback(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Path(restaurant): Path<RestaurantId>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let back = |suffix: &str| {
        let term = form.q.trim();
        if term.is_empty() {
            format!("/customer/discover?{suffix}")
        } else {
            format!(
                "/customer/discover?q={}&{suffix}",
                urlencoding::encode(term)
            )
        }
    };

    let Ok(rating) = form.rating.trim().parse::<u8>() else {
        return Ok(Redirect::to(&back("error=rating")).into_response());
    };
    let comment = form.comment.trim();
    let comment = (!comment.is_empty()).then_some(comment);

    match state
        .mutations()
        .submit_feedback(&user.token, &user.identity, restaurant, rating, comment)
        .await
    {
        Ok(()) => Ok(Redirect::to(&back("success=feedback")).into_response()),
        Err(MutationError::Invalid(_)) => {
            Ok(Redirect::to(&back("error=rating")).into_response())
        }
        Err(error) => {
            tracing::error!(%error, "feedback insert failed");
            Ok(Redirect::to(&back("error=write_failed")).into_response())
        }
    }
}
