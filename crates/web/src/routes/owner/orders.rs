//! Order tracking and status updates.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireOwner;
use crate::state::AppState;
use crate::supabase::records::RestaurantOrder;

use super::{OwnerNav, owner_context};

/// Flash query parameters.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Status form posted from one order card.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "owner/orders.html")]
pub struct OrdersTemplate {
    pub nav: OwnerNav,
    pub orders: Vec<RestaurantOrder>,
    /// Every status an order can move to, for the per-card selector.
    pub statuses: &'static [OrderStatus],
    pub success: Option<&'static str>,
    pub error: Option<&'static str>,
}

/// Display incoming orders, newest first.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn orders_page(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "orders").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let orders = state
        .queries()
        .read(QueryKey::Orders {
            restaurant: context.restaurant_id,
        })
        .await?
        .into_orders()?;

    Ok(OrdersTemplate {
        nav: context.nav,
        orders,
        statuses: &OrderStatus::ALL,
        success: match query.success.as_deref() {
            Some("status_updated") => Some("Order status updated."),
            _ => None,
        },
        error: match query.error.as_deref() {
            Some("invalid_status") => Some("That status is not recognized."),
            Some("update_failed") => Some("Could not update the order. Please try again."),
            _ => None,
        },
    }
    .into_response())
}

/// Move an order to a new status.
#[instrument(skip_all, fields(owner = %user.identity.id, order = %order))]
pub async fn update_status(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Path(order): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "orders").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let Ok(status) = form.status.parse::<OrderStatus>() else {
        return Ok(Redirect::to("/dashboard/orders?error=invalid_status").into_response());
    };

    match state
        .mutations()
        .update_order_status(&user.token, context.restaurant_id, order, status)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/orders?success=status_updated").into_response()),
        Err(error) => {
            tracing::error!(%error, "order status update failed");
            Ok(Redirect::to("/dashboard/orders?error=update_failed").into_response())
        }
    }
}
