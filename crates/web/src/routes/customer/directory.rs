//! Food business directory, grouped by cuisine.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::state::AppState;
use crate::supabase::records::Restaurant;

use super::CustomerNav;

/// Directory page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/directory.html")]
pub struct DirectoryTemplate {
    pub nav: CustomerNav,
    /// Cuisine name to restaurants, alphabetical by cuisine.
    pub sections: Vec<(String, Vec<Restaurant>)>,
}

/// Browse the directory.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn directory(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let restaurants = state
        .queries()
        .read(QueryKey::Restaurants { search: None })
        .await?
        .into_restaurants()?;

    let mut grouped: BTreeMap<String, Vec<Restaurant>> = BTreeMap::new();
    for restaurant in restaurants {
        let cuisine = restaurant
            .cuisine_type
            .clone()
            .unwrap_or_else(|| "Other".to_string());
        grouped.entry(cuisine).or_default().push(restaurant);
    }

    Ok(DirectoryTemplate {
        nav: CustomerNav::new(&user.identity, "directory"),
        sections: grouped.into_iter().collect(),
    }
    .into_response())
}
