//! Grocery stores, their shelves, and the shopping cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use plateful_core::{CartItemId, GroceryItemId, GroceryStoreId, Price};
use serde::Deserialize;
use tracing::instrument;

use crate::cache::QueryKey;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::state::AppState;
use crate::supabase::records::{CartItem, GroceryItem, GroceryStore};

use super::CustomerNav;

/// Flash query parameters on the store page.
#[derive(Debug, Deserialize)]
pub struct StoreQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Add-to-cart form posted from one shelf row.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub store_id: String,
    pub item_id: String,
    pub quantity: String,
}

/// Remove form posted from one cart line.
#[derive(Debug, Deserialize)]
pub struct RemoveCartForm {
    pub store_id: String,
    pub line_id: String,
}

/// Store list template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/grocery_stores.html")]
pub struct StoresTemplate {
    pub nav: CustomerNav,
    pub stores: Vec<GroceryStore>,
}

/// Single store template: shelves on one side, the cart on the other.
#[derive(Template, WebTemplate)]
#[template(path = "customer/grocery_store.html")]
pub struct StoreTemplate {
    pub nav: CustomerNav,
    pub store: GroceryStore,
    pub items: Vec<GroceryItem>,
    pub cart: Vec<CartItem>,
    pub cart_total: Price,
    pub success: Option<&'static str>,
    pub error: Option<&'static str>,
}

/// List grocery stores.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn stores(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let stores = state
        .queries()
        .read(QueryKey::GroceryStores)
        .await?
        .into_grocery_stores()?;

    Ok(StoresTemplate {
        nav: CustomerNav::new(&user.identity, "grocery"),
        stores,
    }
    .into_response())
}

/// Display one store's shelves and the viewer's cart.
#[instrument(skip_all, fields(user = %user.identity.id, store = %store))]
pub async fn store_items(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Path(store): Path<GroceryStoreId>,
    Query(query): Query<StoreQuery>,
) -> Result<Response, AppError> {
    let (stores, items, cart) = tokio::join!(
        state.queries().read(QueryKey::GroceryStores),
        state.queries().read(QueryKey::GroceryItems { store }),
        state.queries().read(QueryKey::CartItems {
            user: user.identity.id,
        }),
    );

    let record = stores?
        .into_grocery_stores()?
        .into_iter()
        .find(|candidate| candidate.id == store)
        .ok_or_else(|| AppError::NotFound(format!("grocery store {store}")))?;

    let cart = cart?.into_cart_items()?;
    let cart_total = cart.iter().map(CartItem::line_total).sum();

    Ok(StoreTemplate {
        nav: CustomerNav::new(&user.identity, "grocery"),
        store: record,
        items: items?.into_grocery_items()?,
        cart,
        cart_total,
        success: match query.success.as_deref() {
            Some("added") => Some("Added to your cart."),
            Some("removed") => Some("Removed from your cart."),
            _ => None,
        },
        error: match query.error.as_deref() {
            Some("quantity") => Some("Quantity must be at least 1."),
            Some("invalid_item") => Some("That item could not be found."),
            Some("write_failed") => Some("Could not update your cart. Please try again."),
            _ => None,
        },
    }
    .into_response())
}

/// Add an item to the cart.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn add_to_cart(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let Ok(store) = form.store_id.parse::<GroceryStoreId>() else {
        return Ok(Redirect::to("/customer/grocery").into_response());
    };
    let back = |suffix: &str| format!("/customer/grocery/{store}?{suffix}");

    let Ok(item) = form.item_id.parse::<GroceryItemId>() else {
        return Ok(Redirect::to(&back("error=invalid_item")).into_response());
    };
    let Ok(quantity) = form.quantity.trim().parse::<u32>() else {
        return Ok(Redirect::to(&back("error=quantity")).into_response());
    };

    match state
        .mutations()
        .add_to_cart(&user.token, &user.identity, item, quantity)
        .await
    {
        Ok(()) => Ok(Redirect::to(&back("success=added")).into_response()),
        Err(crate::services::MutationError::Invalid(_)) => {
            Ok(Redirect::to(&back("error=quantity")).into_response())
        }
        Err(error) => {
            tracing::error!(%error, "cart insert failed");
            Ok(Redirect::to(&back("error=write_failed")).into_response())
        }
    }
}

/// Remove a cart line.
#[instrument(skip_all, fields(user = %user.identity.id))]
pub async fn remove_cart_item(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Form(form): Form<RemoveCartForm>,
) -> Result<Response, AppError> {
    let Ok(store) = form.store_id.parse::<GroceryStoreId>() else {
        return Ok(Redirect::to("/customer/grocery").into_response());
    };
    let back = |suffix: &str| format!("/customer/grocery/{store}?{suffix}");

    let Ok(line) = form.line_id.parse::<CartItemId>() else {
        return Ok(Redirect::to(&back("error=invalid_item")).into_response());
    };

    match state
        .mutations()
        .remove_cart_item(&user.token, &user.identity, line)
        .await
    {
        Ok(()) => Ok(Redirect::to(&back("success=removed")).into_response()),
        Err(error) => {
            tracing::error!(%error, "cart delete failed");
            Ok(Redirect::to(&back("error=write_failed")).into_response())
        }
    }
}
