//! Owner dashboard route handlers.
//!
//! Every page here requires the `restaurant_owner` role. Pages other
//! than settings also require the owner's restaurant record to exist;
//! until it does they bounce to settings, which hosts the creation form.

pub mod marketing;
pub mod menu;
pub mod orders;
pub mod overview;
pub mod reservations;
pub mod settings;

use axum::response::{IntoResponse, Redirect, Response};
use plateful_core::RestaurantId;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::models::Identity;
use crate::state::AppState;
use crate::supabase::records::Restaurant;

/// Sidebar context shared by the dashboard templates.
pub struct OwnerNav {
    pub restaurant_name: String,
    pub active: &'static str,
}

impl OwnerNav {
    fn new(restaurant: &Restaurant, active: &'static str) -> Self {
        Self {
            restaurant_name: restaurant.name.clone(),
            active,
        }
    }
}

/// The owner's restaurant record, if they have created one.
pub(crate) async fn owner_restaurant(
    state: &AppState,
    owner: &Identity,
) -> Result<Option<Restaurant>, AppError> {
    let value = state
        .queries()
        .read(QueryKey::OwnerRestaurant { owner: owner.id })
        .await?;
    Ok(value.into_owner_restaurant()?.map(|restaurant| *restaurant))
}

/// Context required by every dashboard page except settings.
pub(crate) struct OwnerContext {
    pub restaurant_id: RestaurantId,
    pub nav: OwnerNav,
}

/// Resolve the owner's restaurant or bounce to the setup form.
pub(crate) async fn owner_context(
    state: &AppState,
    owner: &Identity,
    active: &'static str,
) -> Result<Result<OwnerContext, Response>, AppError> {
    match owner_restaurant(state, owner).await? {
        Some(restaurant) => Ok(Ok(OwnerContext {
            restaurant_id: restaurant.id,
            nav: OwnerNav::new(&restaurant, active),
        })),
        None => Ok(Err(Redirect::to("/dashboard/settings").into_response())),
    }
}
