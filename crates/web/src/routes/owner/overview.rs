//! Dashboard overview: headline numbers and the latest orders.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use plateful_core::ReservationStatus;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireOwner;
use crate::state::AppState;
use crate::supabase::records::RestaurantOrder;

use super::{OwnerNav, owner_context};

/// How many orders the overview lists.
const RECENT_ORDERS: usize = 5;

/// Overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "owner/overview.html")]
pub struct OverviewTemplate {
    pub nav: OwnerNav,
    pub open_orders: usize,
    pub pending_reservations: usize,
    pub menu_item_count: usize,
    pub active_promotions: usize,
    pub recent_orders: Vec<RestaurantOrder>,
}

/// Display the dashboard overview.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn overview(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "overview").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };
    let restaurant = context.restaurant_id;

    let (orders, reservations, items, promotions) = tokio::join!(
        state.queries().read(QueryKey::Orders { restaurant }),
        state.queries().read(QueryKey::Reservations { restaurant }),
        state.queries().read(QueryKey::MenuItems { restaurant }),
        state.queries().read(QueryKey::Promotions { restaurant }),
    );
    let orders = orders?.into_orders()?;
    let reservations = reservations?.into_reservations()?;
    let items = items?.into_menu_items()?;
    let promotions = promotions?.into_promotions()?;

    let open_orders = orders
        .iter()
        .filter(|order| order.status_or_default().is_open())
        .count();
    let pending_reservations = reservations
        .iter()
        .filter(|reservation| reservation.status_or_default() == ReservationStatus::Pending)
        .count();
    let active_promotions = promotions
        .iter()
        .filter(|promotion| promotion.active())
        .count();

    let mut recent_orders = orders;
    recent_orders.truncate(RECENT_ORDERS);

    Ok(OverviewTemplate {
        nav: context.nav,
        open_orders,
        pending_reservations,
        menu_item_count: items.len(),
        active_promotions,
        recent_orders,
    }
    .into_response())
}
