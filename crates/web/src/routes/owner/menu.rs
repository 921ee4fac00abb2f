//! Menu management: categories and dishes.
//!
//! Failed validation re-renders the page with the submitted values still
//! in the form; only successful writes redirect. A write the platform
//! rejects keeps the form too, with a generic failure notice, and leaves
//! cached reads untouched.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::{MenuCategoryId, MenuItemId, Price, RestaurantId};
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireOwner;
use crate::services::{MenuItemInput, MutationError};
use crate::state::AppState;
use crate::supabase::records::{MenuCategory, MenuItem};

use super::{OwnerNav, owner_context};

const WRITE_FAILED: &str = "Could not save changes. Please try again.";

// =============================================================================
// Form Types
// =============================================================================

/// New category form data.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

/// New or edited menu item form data.
#[derive(Debug, Deserialize)]
pub struct MenuItemForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub image_url: String,
    /// Checkbox: present when checked.
    #[serde(default)]
    pub is_available: Option<String>,
}

impl Default for MenuItemForm {
    /// A blank form with availability pre-checked.
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            price: String::new(),
            category_id: String::new(),
            image_url: String::new(),
            is_available: Some("on".to_string()),
        }
    }
}

impl MenuItemForm {
    fn parse(&self) -> Result<MenuItemInput, String> {
        let price = self
            .price
            .trim()
            .parse::<Price>()
            .map_err(|_| "Price must be a valid amount".to_string())?;
        let category_id = match self.category_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<MenuCategoryId>()
                    .map_err(|_| "Choose a valid category".to_string())?,
            ),
        };
        Ok(MenuItemInput {
            name: self.name.clone(),
            description: non_empty(&self.description),
            price,
            category_id,
            image_url: non_empty(&self.image_url),
            is_available: self.is_available.is_some(),
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Query parameters for success flashes.
#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

fn success_message(code: &str) -> Option<&'static str> {
    match code {
        "item_created" => Some("Menu item added."),
        "item_updated" => Some("Menu item updated."),
        "item_deleted" => Some("Menu item removed."),
        "category_created" => Some("Category added."),
        _ => None,
    }
}

// =============================================================================
// Template
// =============================================================================

/// Menu management page template.
#[derive(Template, WebTemplate)]
#[template(path = "owner/menu.html")]
pub struct MenuTemplate {
    pub nav: OwnerNav,
    pub categories: Vec<MenuCategory>,
    pub items: Vec<MenuItem>,
    pub success: Option<&'static str>,
    /// Preserved item form values plus the validation error, if any.
    pub item_form: MenuItemForm,
    pub item_error: Option<String>,
    /// Preserved category form values plus the validation error, if any.
    pub category_form: CategoryForm,
    pub category_error: Option<String>,
}

async fn menu_template(
    state: &AppState,
    nav: OwnerNav,
    restaurant: RestaurantId,
) -> Result<MenuTemplate, AppError> {
    let (categories, items) = tokio::join!(
        state.queries().read(QueryKey::MenuCategories { restaurant }),
        state.queries().read(QueryKey::MenuItems { restaurant }),
    );

    Ok(MenuTemplate {
        nav,
        categories: categories?.into_menu_categories()?,
        items: items?.into_menu_items()?,
        success: None,
        item_form: MenuItemForm::default(),
        item_error: None,
        category_form: CategoryForm::default(),
        category_error: None,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the menu management page.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn menu_page(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "menu").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
    page.success = query.success.as_deref().and_then(success_message);
    if query.error.as_deref() == Some("delete_failed") {
        page.item_error = Some(WRITE_FAILED.to_string());
    }
    Ok(page.into_response())
}

/// Handle the new category form.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn create_category(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "menu").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    match state
        .mutations()
        .create_menu_category(&user.token, context.restaurant_id, &form.name)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/menu?success=category_created").into_response()),
        Err(MutationError::Invalid(message)) => {
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.category_form = form;
            page.category_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "category insert failed");
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.category_form = form;
            page.category_error = Some(WRITE_FAILED.to_string());
            Ok(page.into_response())
        }
    }
}

/// Handle the new item form.
#[instrument(skip_all, fields(owner = %user.identity.id))]
pub async fn create_item(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Form(form): Form<MenuItemForm>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "menu").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => {
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.item_form = form;
            page.item_error = Some(message);
            return Ok(page.into_response());
        }
    };

    match state
        .mutations()
        .create_menu_item(&user.token, context.restaurant_id, &input)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/menu?success=item_created").into_response()),
        Err(MutationError::Invalid(message)) => {
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.item_form = form;
            page.item_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "menu item insert failed");
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.item_form = form;
            page.item_error = Some(WRITE_FAILED.to_string());
            Ok(page.into_response())
        }
    }
}

/// Handle an item edit form.
#[instrument(skip_all, fields(owner = %user.identity.id, item = %item))]
pub async fn update_item(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Path(item): Path<MenuItemId>,
    Form(form): Form<MenuItemForm>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "menu").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => {
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.item_form = form;
            page.item_error = Some(message);
            return Ok(page.into_response());
        }
    };

    match state
        .mutations()
        .update_menu_item(&user.token, context.restaurant_id, item, &input)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/menu?success=item_updated").into_response()),
        Err(MutationError::Invalid(message)) => {
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.item_form = form;
            page.item_error = Some(message);
            Ok(page.into_response())
        }
        Err(MutationError::Write(error)) => {
            tracing::error!(%error, "menu item update failed");
            let mut page = menu_template(&state, context.nav, context.restaurant_id).await?;
            page.item_form = form;
            page.item_error = Some(WRITE_FAILED.to_string());
            Ok(page.into_response())
        }
    }
}

/// Handle an item delete.
#[instrument(skip_all, fields(owner = %user.identity.id, item = %item))]
pub async fn delete_item(
    RequireOwner(user): RequireOwner,
    State(state): State<AppState>,
    Path(item): Path<MenuItemId>,
) -> Result<Response, AppError> {
    let context = match owner_context(&state, &user.identity, "menu").await? {
        Ok(context) => context,
        Err(redirect) => return Ok(redirect),
    };

    match state
        .mutations()
        .delete_menu_item(&user.token, context.restaurant_id, item)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/menu?success=item_deleted").into_response()),
        Err(error) => {
            tracing::error!(%error, "menu item delete failed");
            Ok(Redirect::to("/dashboard/menu?error=delete_failed").into_response())
        }
    }
}
