//! Reservation tracking and confirmation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::{ReservationId, ReservationStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireOwner;
use crate::state::AppState;
use crate::supabase::records::Reservation;

use super::{OwnerNav, owner_context};

/// Flash query parameters.
#[derive(Debug, Deserialize)]
pub struct ReservationsQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Status form posted from one reservation card.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Reservations page template.
#[derive(Template, WebTemplate)]
#[template(path = "owner/reservations.html")]
pub struct ReservationsTemplate {
    pub nav: OwnerNav,
    pub reservations: Vec<Reservation>,
    pub statuses: &'static [ReservationStatus],
    pub success: Option<&'static str>,
    pub error: Option<&'static str>,
}

/// Display upcoming reservations.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn reservations_page(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Query(query): Query<ReservationsQuery>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "reservations").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let reservations = state
        .queries()
        .read(QueryKey::Reservations {
            restaurant: context.restaurant_id,
        })
        .await?
        .into_reservations()?;

    Ok(ReservationsTemplate {
        nav: context.nav,
        reservations,
        statuses: &ReservationStatus::ALL,
        success: match query.success.as_deref() {
            Some("status_updated") => Some("Reservation updated."),
            _ => None,
        },
        error: match query.error.as_deref() {
            Some("invalid_status") => Some("That status is not recognized."),
            Some("update_failed") => Some("Could not update the reservation. Please try again."),
            _ => None,
        },
    }
    .into_response())
}

/// Confirm or cancel a reservation.
#[instrument(skip_all, fields(owner = %user.identity.id, reservation = %reservation))]
pub async fn update_status(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Path(reservation): Path<ReservationId>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "reservations").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let Ok(status) = form.status.parse::<ReservationStatus>() else {
        return Ok(Redirect::to("/dashboard/reservations?error=invalid_status").into_response());
    };

    match state
        .mutations()
        .update_reservation_status(&user.token, context.restaurant_id, reservation, status)
        .await
    {
        Ok(()) => {
            Ok(Redirect::to("/dashboard/reservations?success=status_updated").into_response())
        }
        Err(error) => {
            tracing::error!(%error, "reservation status update failed");
            Ok(Redirect::to("/dashboard/reservations?error=update_failed").into_response())
        }
    }
}
