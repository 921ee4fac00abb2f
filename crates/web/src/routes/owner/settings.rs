//! Restaurant profile settings.
//!
//! This is the one dashboard page that works before a restaurant exists:
//! the same form creates the profile on first save and updates it after.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireOwner;
use crate::services::{MutationError, RestaurantInput};
use crate::state::AppState;
use crate::supabase::records::Restaurant;

use super::{OwnerNav, owner_restaurant};

/// Flash query parameters.
#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub success: Option<String>,
}

/// Restaurant profile form data.
#[derive(Debug, Default, Deserialize)]
pub struct RestaurantForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl RestaurantForm {
    fn from_record(restaurant: &Restaurant) -> Self {
        Self {
            name: restaurant.name.clone(),
            description: restaurant.description.clone().unwrap_or_default(),
            cuisine_type: restaurant.cuisine_type.clone().unwrap_or_default(),
            address: restaurant.address.clone().unwrap_or_default(),
            phone: restaurant.phone.clone().unwrap_or_default(),
            email: restaurant.email.clone().unwrap_or_default(),
        }
    }

    fn to_input(&self) -> RestaurantInput {
        RestaurantInput {
            name: self.name.clone(),
            description: non_empty(&self.description),
            cuisine_type: non_empty(&self.cuisine_type),
            address: non_empty(&self.address),
            phone: non_empty(&self.phone),
            email: non_empty(&self.email),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "owner/settings.html")]
pub struct SettingsTemplate {
    pub nav: OwnerNav,
    /// `false` until the owner saves the form for the first time.
    pub has_restaurant: bool,
    pub form: RestaurantForm,
    pub error: Option<String>,
    pub success: Option<&'static str>,
}

fn settings_template(restaurant: Option<&Restaurant>) -> SettingsTemplate {
    let nav = match restaurant {
        Some(record) => OwnerNav::new(record, "settings"),
        None => OwnerNav {
            restaurant_name: "Your restaurant".to_string(),
            active: "settings",
        },
    };

    SettingsTemplate {
        nav,
        has_restaurant: restaurant.is_some(),
        form: restaurant.map(RestaurantForm::from_record).unwrap_or_default(),
        error: None,
        success: None,
    }
}

/// Display the restaurant profile form.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn settings_page(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Query(query): Query<SettingsQuery>,
) -> Result<Response, AppError> {
    let restaurant = owner_restaurant(&state, &user.identity).await?;

    let mut page = settings_template(restaurant.as_ref());
    if query.success.as_deref() == Some("saved") {
        page.success = Some("Restaurant profile saved.");
    }
    Ok(page.into_response())
}

/// Create or update the restaurant profile.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn save_settings(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Form(form): Form<RestaurantForm>,
) -> Result<Response, AppError> {
    let restaurant = owner_restaurant(&state, &user.identity).await?;
    let input = form.to_input();

    let outcome = match restaurant.as_ref() {
        Some(record) => {
            state
                .mutations()
                .update_restaurant(&user.token, record.id, &input)
                .await
        }
        None => {
            state
                .mutations()
                .create_restaurant(&user.token, &user.identity, &input)
                .await
        }
    };

    match outcome {
        Ok(()) => Ok(Redirect::to("/dashboard/settings?success=saved").into_response()),
        Err(MutationError::Invalid(message)) => {
            let mut page = settings_template(restaurant.as_ref());
            page.form = form;
            page.error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "restaurant save failed");
            let mut page = settings_template(restaurant.as_ref());
            page.form = form;
            page.error = Some("Could not save changes. Please try again.".to_string());
            Ok(page.into_response())
        }
    }
}
