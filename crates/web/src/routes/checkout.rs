//! Checkout route handlers (experimental).
//!
//! Renders the hosted payment widget for a chosen plan and records the
//! widget's approve/error callbacks. There is no entitlement system
//! behind the payment yet; an approval is logged and acknowledged.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::services::{BillingCycle, Plan, payments};
use crate::state::AppState;

/// Query parameters for the checkout page.
#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub billing: Option<String>,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Approve callback payload from the widget.
#[derive(Debug, Deserialize)]
pub struct ApproveForm {
    /// Provider-side order reference, when the widget reports one.
    pub order_ref: Option<String>,
}

/// Error callback payload from the widget.
#[derive(Debug, Deserialize)]
pub struct WidgetErrorForm {
    pub message: Option<String>,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub plan: Plan,
    pub billing: BillingCycle,
    pub amount: u32,
    pub cadence: &'static str,
    /// Widget client identifier; `None` renders an unavailable notice.
    pub client_id: Option<String>,
    pub approved: bool,
    pub failed: bool,
}

/// Display the checkout page for a plan.
#[instrument(skip(state))]
pub async fn checkout_page(
    State(state): State<AppState>,
    Path(plan): Path<String>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Response, AppError> {
    let Some(plan) = payments::find_plan(&plan) else {
        return Err(AppError::NotFound(format!("plan {plan}")));
    };
    let billing = BillingCycle::from_query(query.billing.as_deref());

    // The widget cannot initialize without a client id; the page still
    // renders with an unavailable notice instead of failing outright.
    let client_id = match state.supabase().functions().payment_client_id().await {
        Ok(client_id) => client_id,
        Err(error) => {
            tracing::warn!(%error, "payment configuration unavailable");
            None
        }
    };

    Ok(CheckoutTemplate {
        plan: *plan,
        billing,
        amount: plan.price_for(billing),
        cadence: plan.cadence_label(billing),
        client_id,
        approved: query.success.is_some(),
        failed: query.error.is_some(),
    }
    .into_response())
}

/// Record an approved payment and bounce back to the checkout page.
#[instrument(skip(form))]
pub async fn approve(
    Path(plan): Path<String>,
    Query(query): Query<CheckoutQuery>,
    Form(form): Form<ApproveForm>,
) -> Result<Response, AppError> {
    let Some(plan) = payments::find_plan(&plan) else {
        return Err(AppError::NotFound(format!("plan {plan}")));
    };
    let billing = BillingCycle::from_query(query.billing.as_deref());

    tracing::info!(
        plan = plan.slug,
        billing = billing.as_str(),
        order_ref = form.order_ref.as_deref().unwrap_or("-"),
        "payment approved"
    );
    add_breadcrumb(
        "payment",
        "Payment approved",
        Some(&[("plan", plan.slug), ("billing", billing.as_str())]),
    );

    let target = format!("/checkout/{}?billing={}&success=1", plan.slug, billing.as_str());
    Ok(Redirect::to(&target).into_response())
}

/// Record a widget failure and bounce back with an error banner.
#[instrument(skip(form))]
pub async fn widget_error(
    Path(plan): Path<String>,
    Query(query): Query<CheckoutQuery>,
    Form(form): Form<WidgetErrorForm>,
) -> Result<Response, AppError> {
    let Some(plan) = payments::find_plan(&plan) else {
        return Err(AppError::NotFound(format!("plan {plan}")));
    };
    let billing = BillingCycle::from_query(query.billing.as_deref());

    tracing::warn!(
        plan = plan.slug,
        message = form.message.as_deref().unwrap_or("-"),
        "payment widget reported an error"
    );

    let target = format!("/checkout/{}?billing={}&error=1", plan.slug, billing.as_str());
    Ok(Redirect::to(&target).into_response())
}
