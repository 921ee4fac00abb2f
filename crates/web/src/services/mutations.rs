//! Write flows: validate, write with the user's token, invalidate.
//!
//! Every mutation follows the same sequence: validate inputs locally,
//! perform the table write carrying the session's access token (so row
//! security applies to the actual user), then invalidate the affected
//! cache families. Validation failures never reach the backend, and a
//! failed write leaves the cache untouched so pages keep rendering the
//! last known state.

use chrono::NaiveDate;
use plateful_core::{
    CartItemId, ChannelId, GroceryItemId, MenuCategoryId, MenuItemId, OrderId, OrderStatus,
    PostId, Price, ReservationId, ReservationStatus, RestaurantId,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::cache::{QueryCache, ResourceFamily};
use crate::models::Identity;
use crate::supabase::records::Like;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Why a mutation did not happen.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Input failed local validation; nothing was sent to the backend.
    #[error("{0}")]
    Invalid(String),

    /// The backend rejected or failed the write.
    #[error("write failed: {0}")]
    Write(#[from] SupabaseError),
}

fn invalid(message: &str) -> MutationError {
    MutationError::Invalid(message.to_string())
}

fn opt_trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A new or edited menu item.
#[derive(Debug, Clone)]
pub struct MenuItemInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: Option<MenuCategoryId>,
    pub image_url: Option<String>,
    pub is_available: bool,
}

/// A new promotion campaign.
#[derive(Debug, Clone)]
pub struct PromotionInput {
    pub name: String,
    pub description: Option<String>,
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Option<Price>,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
}

/// Restaurant profile fields, for both creation and settings updates.
#[derive(Debug, Clone)]
pub struct RestaurantInput {
    pub name: String,
    pub description: Option<String>,
    pub cuisine_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl RestaurantInput {
    fn validate(&self) -> Result<(), MutationError> {
        if self.name.trim().is_empty() {
            return Err(invalid("Restaurant name cannot be empty"));
        }
        if let Some(email) = opt_trimmed(self.email.as_deref())
            && plateful_core::Email::parse(email).is_err()
        {
            return Err(invalid("Contact email must be a valid email address"));
        }
        Ok(())
    }

    fn body(&self) -> serde_json::Value {
        json!({
            "name": self.name.trim(),
            "description": opt_trimmed(self.description.as_deref()),
            "cuisine_type": opt_trimmed(self.cuisine_type.as_deref()),
            "address": opt_trimmed(self.address.as_deref()),
            "phone": opt_trimmed(self.phone.as_deref()),
            "email": opt_trimmed(self.email.as_deref()),
        })
    }
}

impl MenuItemInput {
    fn validate(&self) -> Result<(), MutationError> {
        if self.name.trim().is_empty() {
            return Err(invalid("Item name cannot be empty"));
        }
        if self.price.amount().is_sign_negative() {
            return Err(invalid("Price cannot be negative"));
        }
        if let Some(image) = opt_trimmed(self.image_url.as_deref())
            && Url::parse(image).is_err()
        {
            return Err(invalid("Image URL must be a valid URL"));
        }
        Ok(())
    }

    fn body(&self, restaurant: RestaurantId) -> serde_json::Value {
        json!({
            "restaurant_id": restaurant,
            "name": self.name.trim(),
            "description": opt_trimmed(self.description.as_deref()),
            "price": self.price,
            "category_id": self.category_id,
            "image_url": opt_trimmed(self.image_url.as_deref()),
            "is_available": self.is_available,
        })
    }
}

impl PromotionInput {
    fn validate(&self) -> Result<(), MutationError> {
        if self.name.trim().is_empty() {
            return Err(invalid("Promotion name cannot be empty"));
        }
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .map_err(|_| invalid("Start date must be formatted YYYY-MM-DD"))?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d")
            .map_err(|_| invalid("End date must be formatted YYYY-MM-DD"))?;
        if end < start {
            return Err(invalid("End date must not be before the start date"));
        }
        if let Some(percentage) = self.discount_percentage
            && !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&percentage)
        {
            return Err(invalid("Discount percentage must be between 0 and 100"));
        }
        if let Some(amount) = self.discount_amount
            && amount.amount().is_sign_negative()
        {
            return Err(invalid("Discount amount cannot be negative"));
        }
        Ok(())
    }
}

/// Write-side service shared by all route handlers.
///
/// Cheap to clone. Reads after a write go through the shared
/// [`QueryCache`], which this service invalidates.
#[derive(Clone)]
pub struct Mutations {
    client: SupabaseClient,
    queries: QueryCache,
}

impl Mutations {
    #[must_use]
    pub const fn new(client: SupabaseClient, queries: QueryCache) -> Self {
        Self { client, queries }
    }

    // ===== Customer mutations =====

    /// Publish a social post.
    ///
    /// # Errors
    ///
    /// `Invalid` for empty content or a malformed image URL; `Write` if
    /// the backend rejects the insert.
    #[instrument(skip(self, token, content, image_url), fields(author = %author.id))]
    pub async fn create_post(
        &self,
        token: &str,
        author: &Identity,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<(), MutationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(invalid("Post content cannot be empty"));
        }
        let image_url = opt_trimmed(image_url);
        if let Some(image) = image_url
            && Url::parse(image).is_err()
        {
            return Err(invalid("Image URL must be a valid URL"));
        }

        self.client
            .table("posts")
            .bearer(token)
            .insert(&json!({
                "user_id": author.id,
                "content": content,
                "image_url": image_url,
                "type": "social",
            }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Posts])
            .await;
        debug!("post created");
        Ok(())
    }

    /// Like a post, or remove an existing like.
    ///
    /// # Errors
    ///
    /// `Write` if the lookup or the write fails.
    #[instrument(skip(self, token), fields(user = %user.id, post = %post))]
    pub async fn toggle_like(
        &self,
        token: &str,
        user: &Identity,
        post: PostId,
    ) -> Result<(), MutationError> {
        let existing: Option<Like> = self
            .client
            .table("likes")
            .select("id")
            .eq("post_id", post)
            .eq("user_id", user.id)
            .bearer(token)
            .fetch_optional()
            .await?;

        if existing.is_some() {
            self.client
                .table("likes")
                .eq("post_id", post)
                .eq("user_id", user.id)
                .bearer(token)
                .delete()
                .await?;
            debug!("like removed");
        } else {
            self.client
                .table("likes")
                .bearer(token)
                .insert(&json!({ "post_id": post, "user_id": user.id }))
                .await?;
            debug!("like added");
        }

        self.queries
            .invalidate_families(&[ResourceFamily::Posts])
            .await;
        Ok(())
    }

    /// Comment on a post. Invalidate comments and posts: the feed shows
    /// per-post comment counts.
    ///
    /// # Errors
    ///
    /// `Invalid` for empty content; `Write` if the insert fails.
    #[instrument(skip(self, token, content), fields(author = %author.id, post = %post))]
    pub async fn add_comment(
        &self,
        token: &str,
        author: &Identity,
        post: PostId,
        content: &str,
    ) -> Result<(), MutationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(invalid("Comment cannot be empty"));
        }

        self.client
            .table("comments")
            .bearer(token)
            .insert(&json!({
                "post_id": post,
                "user_id": author.id,
                "content": content,
            }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Comments, ResourceFamily::Posts])
            .await;
        debug!("comment added");
        Ok(())
    }

    /// Post into a community channel.
    ///
    /// # Errors
    ///
    /// `Invalid` for an empty title or body; `Write` if the insert fails.
    #[instrument(skip(self, token, title, content), fields(author = %author.id, channel = %channel))]
    pub async fn create_community_post(
        &self,
        token: &str,
        author: &Identity,
        channel: ChannelId,
        title: &str,
        content: &str,
    ) -> Result<(), MutationError> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(invalid("Title cannot be empty"));
        }
        if content.is_empty() {
            return Err(invalid("Post content cannot be empty"));
        }

        self.client
            .table("community_posts")
            .bearer(token)
            .insert(&json!({
                "channel_id": channel,
                "user_id": author.id,
                "title": title,
                "content": content,
            }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::CommunityPosts])
            .await;
        debug!("community post created");
        Ok(())
    }

    /// Update the signed-in user's display name.
    ///
    /// # Errors
    ///
    /// `Invalid` for an empty name; `Write` if the update fails.
    #[instrument(skip(self, token, full_name), fields(user = %user.id))]
    pub async fn update_profile(
        &self,
        token: &str,
        user: &Identity,
        full_name: &str,
    ) -> Result<(), MutationError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(invalid("Name cannot be empty"));
        }

        self.client
            .table("profiles")
            .eq("id", user.id)
            .bearer(token)
            .update(&json!({ "full_name": full_name }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Profiles])
            .await;
        debug!("profile updated");
        Ok(())
    }

    /// Leave feedback for a restaurant.
    ///
    /// # Errors
    ///
    /// `Invalid` for a rating outside 1 to 5; `Write` if the insert fails.
    #[instrument(skip(self, token, comment), fields(customer = %customer.id, restaurant = %restaurant))]
    pub async fn submit_feedback(
        &self,
        token: &str,
        customer: &Identity,
        restaurant: RestaurantId,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<(), MutationError> {
        if !(1..=5).contains(&rating) {
            return Err(invalid("Rating must be between 1 and 5"));
        }

        self.client
            .table("feedback")
            .bearer(token)
            .insert(&json!({
                "customer_id": customer.id,
                "restaurant_id": restaurant,
                "rating": rating,
                "comment": opt_trimmed(comment),
            }))
            .await?;

        debug!("feedback submitted");
        Ok(())
    }

    /// Add a grocery item to the user's cart.
    ///
    /// # Errors
    ///
    /// `Invalid` for a zero quantity; `Write` if the insert fails.
    #[instrument(skip(self, token), fields(user = %user.id, item = %item))]
    pub async fn add_to_cart(
        &self,
        token: &str,
        user: &Identity,
        item: GroceryItemId,
        quantity: u32,
    ) -> Result<(), MutationError> {
        if quantity == 0 {
            return Err(invalid("Quantity must be at least 1"));
        }

        self.client
            .table("shopping_cart")
            .bearer(token)
            .insert(&json!({
                "user_id": user.id,
                "item_id": item,
                "quantity": quantity,
            }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Cart])
            .await;
        debug!("cart line added");
        Ok(())
    }

    /// Remove one line from the user's cart.
    ///
    /// # Errors
    ///
    /// `Write` if the delete fails.
    #[instrument(skip(self, token), fields(user = %user.id, line = %line))]
    pub async fn remove_cart_item(
        &self,
        token: &str,
        user: &Identity,
        line: CartItemId,
    ) -> Result<(), MutationError> {
        self.client
            .table("shopping_cart")
            .eq("id", line)
            .eq("user_id", user.id)
            .bearer(token)
            .delete()
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Cart])
            .await;
        debug!("cart line removed");
        Ok(())
    }

    // ===== Owner mutations =====

    /// Create the owner's restaurant record.
    ///
    /// # Errors
    ///
    /// `Invalid` for a missing name or malformed contact email; `Write`
    /// if the insert fails.
    #[instrument(skip(self, token, input), fields(owner = %owner.id))]
    pub async fn create_restaurant(
        &self,
        token: &str,
        owner: &Identity,
        input: &RestaurantInput,
    ) -> Result<(), MutationError> {
        input.validate()?;

        let mut body = input.body();
        if let Some(map) = body.as_object_mut() {
            map.insert("owner_id".to_string(), json!(owner.id));
        }

        self.client
            .table("restaurants")
            .bearer(token)
            .insert(&body)
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Restaurants])
            .await;
        debug!("restaurant created");
        Ok(())
    }

    /// Update the restaurant's public profile.
    ///
    /// # Errors
    ///
    /// `Invalid` for a missing name or malformed contact email; `Write`
    /// if the update fails.
    #[instrument(skip(self, token, input), fields(restaurant = %restaurant))]
    pub async fn update_restaurant(
        &self,
        token: &str,
        restaurant: RestaurantId,
        input: &RestaurantInput,
    ) -> Result<(), MutationError> {
        input.validate()?;

        self.client
            .table("restaurants")
            .eq("id", restaurant)
            .bearer(token)
            .update(&input.body())
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Restaurants])
            .await;
        debug!("restaurant updated");
        Ok(())
    }

    /// Add a menu section.
    ///
    /// # Errors
    ///
    /// `Invalid` for an empty name; `Write` if the insert fails.
    #[instrument(skip(self, token, name), fields(restaurant = %restaurant))]
    pub async fn create_menu_category(
        &self,
        token: &str,
        restaurant: RestaurantId,
        name: &str,
    ) -> Result<(), MutationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("Category name cannot be empty"));
        }

        self.client
            .table("menu_categories")
            .bearer(token)
            .insert(&json!({ "restaurant_id": restaurant, "name": name }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::MenuCategories])
            .await;
        debug!("menu category created");
        Ok(())
    }

    /// Add a dish to the menu.
    ///
    /// # Errors
    ///
    /// `Invalid` for a missing name, negative price, or malformed image
    /// URL; `Write` if the insert fails.
    #[instrument(skip(self, token, input), fields(restaurant = %restaurant))]
    pub async fn create_menu_item(
        &self,
        token: &str,
        restaurant: RestaurantId,
        input: &MenuItemInput,
    ) -> Result<(), MutationError> {
        input.validate()?;

        self.client
            .table("menu_items")
            .bearer(token)
            .insert(&input.body(restaurant))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::MenuItems])
            .await;
        debug!("menu item created");
        Ok(())
    }

    /// Edit an existing dish.
    ///
    /// # Errors
    ///
    /// `Invalid` for a missing name, negative price, or malformed image
    /// URL; `Write` if the update fails.
    #[instrument(skip(self, token, input), fields(restaurant = %restaurant, item = %item))]
    pub async fn update_menu_item(
        &self,
        token: &str,
        restaurant: RestaurantId,
        item: MenuItemId,
        input: &MenuItemInput,
    ) -> Result<(), MutationError> {
        input.validate()?;

        self.client
            .table("menu_items")
            .eq("id", item)
            .eq("restaurant_id", restaurant)
            .bearer(token)
            .update(&input.body(restaurant))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::MenuItems])
            .await;
        debug!("menu item updated");
        Ok(())
    }

    /// Remove a dish from the menu.
    ///
    /// # Errors
    ///
    /// `Write` if the delete fails.
    #[instrument(skip(self, token), fields(restaurant = %restaurant, item = %item))]
    pub async fn delete_menu_item(
        &self,
        token: &str,
        restaurant: RestaurantId,
        item: MenuItemId,
    ) -> Result<(), MutationError> {
        self.client
            .table("menu_items")
            .eq("id", item)
            .eq("restaurant_id", restaurant)
            .bearer(token)
            .delete()
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::MenuItems])
            .await;
        debug!("menu item deleted");
        Ok(())
    }

    /// Move an order through its lifecycle.
    ///
    /// # Errors
    ///
    /// `Write` if the update fails.
    #[instrument(skip(self, token), fields(restaurant = %restaurant, order = %order, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &str,
        restaurant: RestaurantId,
        order: OrderId,
        status: OrderStatus,
    ) -> Result<(), MutationError> {
        self.client
            .table("orders")
            .eq("id", order)
            .eq("restaurant_id", restaurant)
            .bearer(token)
            .update(&json!({ "status": status.as_str() }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Orders])
            .await;
        debug!("order status updated");
        Ok(())
    }

    /// Confirm or cancel a reservation.
    ///
    /// # Errors
    ///
    /// `Write` if the update fails.
    #[instrument(skip(self, token), fields(restaurant = %restaurant, reservation = %reservation, status = %status))]
    pub async fn update_reservation_status(
        &self,
        token: &str,
        restaurant: RestaurantId,
        reservation: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), MutationError> {
        self.client
            .table("reservations")
            .eq("id", reservation)
            .eq("restaurant_id", restaurant)
            .bearer(token)
            .update(&json!({ "status": status.as_str() }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Reservations])
            .await;
        debug!("reservation status updated");
        Ok(())
    }

    /// Launch a promotion.
    ///
    /// # Errors
    ///
    /// `Invalid` for a missing name, malformed or reversed dates, or an
    /// out-of-range discount; `Write` if the insert fails.
    #[instrument(skip(self, token, input), fields(restaurant = %restaurant))]
    pub async fn create_promotion(
        &self,
        token: &str,
        restaurant: RestaurantId,
        input: &PromotionInput,
    ) -> Result<(), MutationError> {
        input.validate()?;

        self.client
            .table("promotions")
            .bearer(token)
            .insert(&json!({
                "restaurant_id": restaurant,
                "name": input.name.trim(),
                "description": opt_trimmed(input.description.as_deref()),
                "discount_percentage": input.discount_percentage,
                "discount_amount": input.discount_amount,
                "start_date": input.start_date,
                "end_date": input.end_date,
                "is_active": input.is_active,
            }))
            .await?;

        self.queries
            .invalidate_families(&[ResourceFamily::Promotions])
            .await;
        debug!("promotion created");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use plateful_core::{Email, Role, UserId};
    use secrecy::SecretString;

    use crate::cache::SupabaseFetcher;
    use crate::config::{CacheConfig, SupabaseConfig};

    use super::*;

    // The backend here refuses connections, so a mutation that passes
    // validation would surface as `Write`. Seeing `Invalid` proves the
    // input was rejected before any request went out.
    fn mutations() -> Mutations {
        let config = SupabaseConfig {
            url: url::Url::parse("http://127.0.0.1:1").unwrap(),
            anon_key: "test-anon-key".to_string(),
            service_role_key: SecretString::from("test-service-key"),
        };
        let client = SupabaseClient::new(&config);
        let queries = QueryCache::new(
            Arc::new(SupabaseFetcher::new(client.clone())),
            &CacheConfig::default(),
        );
        Mutations::new(client, queries)
    }

    fn customer() -> Identity {
        Identity {
            id: UserId::new(),
            email: Email::parse("customer@example.com").unwrap(),
            role: Role::Customer,
        }
    }

    fn assert_invalid(result: Result<(), MutationError>, needle: &str) {
        match result {
            Err(MutationError::Invalid(message)) => {
                assert!(message.contains(needle), "message was: {message}");
            }
            other => panic!("expected local validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_post_content_is_rejected_locally() {
        let result = mutations()
            .create_post("token", &customer(), "   \n ", None)
            .await;
        assert_invalid(result, "empty");
    }

    #[tokio::test]
    async fn malformed_image_url_is_rejected_locally() {
        let result = mutations()
            .create_post("token", &customer(), "great ramen", Some("not a url"))
            .await;
        assert_invalid(result, "URL");
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_locally() {
        let result = mutations()
            .add_comment("token", &customer(), PostId::new(), "  ")
            .await;
        assert_invalid(result, "empty");
    }

    #[tokio::test]
    async fn zero_quantity_cart_add_is_rejected_locally() {
        let result = mutations()
            .add_to_cart("token", &customer(), GroceryItemId::new(), 0)
            .await;
        assert_invalid(result, "at least 1");
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected_locally() {
        let service = mutations();
        for rating in [0u8, 6] {
            let result = service
                .submit_feedback("token", &customer(), RestaurantId::new(), rating, None)
                .await;
            assert_invalid(result, "between 1 and 5");
        }
    }

    #[tokio::test]
    async fn negative_menu_item_price_is_rejected_locally() {
        let input = MenuItemInput {
            name: "Soup".to_string(),
            description: None,
            price: Price::from(Decimal::NEGATIVE_ONE),
            category_id: None,
            image_url: None,
            is_available: true,
        };
        let result = mutations()
            .create_menu_item("token", RestaurantId::new(), &input)
            .await;
        assert_invalid(result, "negative");
    }

    #[tokio::test]
    async fn reversed_promotion_dates_are_rejected_locally() {
        let input = PromotionInput {
            name: "Summer deal".to_string(),
            description: None,
            discount_percentage: None,
            discount_amount: None,
            start_date: "2024-08-01".to_string(),
            end_date: "2024-07-01".to_string(),
            is_active: true,
        };
        let result = mutations()
            .create_promotion("token", RestaurantId::new(), &input)
            .await;
        assert_invalid(result, "before the start");
    }

    #[tokio::test]
    async fn discount_percentage_is_bounded() {
        let input = PromotionInput {
            name: "Too generous".to_string(),
            description: None,
            discount_percentage: Some(Decimal::from(150)),
            discount_amount: None,
            start_date: "2024-07-01".to_string(),
            end_date: "2024-08-01".to_string(),
            is_active: true,
        };
        let result = mutations()
            .create_promotion("token", RestaurantId::new(), &input)
            .await;
        assert_invalid(result, "between 0 and 100");
    }

    #[tokio::test]
    async fn restaurant_contact_email_is_validated() {
        let input = RestaurantInput {
            name: "Plateful Diner".to_string(),
            description: None,
            cuisine_type: None,
            address: None,
            phone: None,
            email: Some("not-an-email".to_string()),
        };
        let result = mutations()
            .update_restaurant("token", RestaurantId::new(), &input)
            .await;
        assert_invalid(result, "valid email");
    }
}
