//! Local services marketplace.

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
use crate::supabase::records::MarketplaceService;

use super::CustomerNav;

/// Marketplace page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/marketplace.html")]
pub struct MarketplaceTemplate {
    pub nav: CustomerNav,
    pub services: Vec<MarketplaceService>,
}

/// Browse services offered around the food scene.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn marketplace(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let services = state
        .queries()
        .read(QueryKey::MarketplaceServices)
        .await?
        .into_services()?;

    Ok(MarketplaceTemplate {
        nav: CustomerNav::new(&user.identity, "marketplace"),
        services,
    }
    .into_response())
}
