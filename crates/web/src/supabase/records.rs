//! Typed rows returned by the table API.
//!
//! Each struct models only the columns (and relationship embeds) the
//! application reads; unknown columns are ignored during deserialization.
//! Nullable status columns stay `Option` here and are defaulted at the edge
//! via the `status_or_default` helpers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use plateful_core::{
    CartItemId, ChannelId, CommentId, CommunityPostId, GroceryItemId, GroceryStoreId, LikeId,
    MenuCategoryId, MenuItemId, OrderId, OrderItemId, OrderStatus, PostId, Price, PromotionId,
    ReservationId, ReservationStatus, RestaurantId, Role, ServiceId, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// A user profile row. The primary key doubles as the auth user id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub user_type: Option<Role>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

/// Author columns embedded into posts and comments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorProfile {
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An aggregate count embed (`likes(count)` comes back as `[{"count": n}]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CountRow {
    pub count: i64,
}

/// A social feed post with embedded author and aggregate counts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub profiles: Option<AuthorProfile>,
    #[serde(default)]
    pub likes: Vec<CountRow>,
    #[serde(default)]
    pub comments: Vec<CountRow>,
}

impl Post {
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.profiles
            .as_ref()
            .and_then(|author| author.full_name.as_deref())
            .unwrap_or("Anonymous")
    }

    #[must_use]
    pub fn like_count(&self) -> i64 {
        self.likes.first().map_or(0, |row| row.count)
    }

    #[must_use]
    pub fn comment_count(&self) -> i64 {
        self.comments.first().map_or(0, |row| row.count)
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub profiles: Option<AuthorProfile>,
}

impl Comment {
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.profiles
            .as_ref()
            .and_then(|author| author.full_name.as_deref())
            .unwrap_or("Anonymous")
    }
}

/// A like row; only its existence matters (toggling).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Like {
    pub id: LikeId,
}

/// Who the viewer follows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserFollow {
    pub following_id: UserId,
}

/// A restaurant. Each owner has at most one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub cuisine_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A menu section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MenuCategory {
    pub id: MenuCategoryId,
    pub restaurant_id: RestaurantId,
    pub name: String,
}

/// Category name embed for menu items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryName {
    pub name: String,
}

/// A dish on the menu.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub category_id: Option<MenuCategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    #[serde(default)]
    pub menu_categories: Option<CategoryName>,
}

impl MenuItem {
    /// Availability defaults to true when the column is unset.
    #[must_use]
    pub fn available(&self) -> bool {
        self.is_available.unwrap_or(true)
    }

    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.menu_categories.as_ref().map(|category| category.name.as_str())
    }
}

/// Name embed for order line items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuItemName {
    pub name: String,
}

/// A line item within an order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub unit_price: Price,
    pub notes: Option<String>,
    #[serde(default)]
    pub menu_items: Option<MenuItemName>,
}

impl OrderItem {
    #[must_use]
    pub fn item_name(&self) -> &str {
        self.menu_items
            .as_ref()
            .map_or("(removed item)", |item| item.name.as_str())
    }

    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// A customer order placed with a restaurant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestaurantOrder {
    pub id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub status: Option<OrderStatus>,
    pub total_amount: Price,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

impl RestaurantOrder {
    /// The status column is nullable; a null means freshly placed.
    #[must_use]
    pub fn status_or_default(&self) -> OrderStatus {
        self.status.unwrap_or_default()
    }
}

/// A table reservation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub party_size: u32,
    pub status: Option<ReservationStatus>,
    pub notes: Option<String>,
}

impl Reservation {
    #[must_use]
    pub fn status_or_default(&self) -> ReservationStatus {
        self.status.unwrap_or_default()
    }
}

/// A promotional campaign.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub discount_amount: Option<Price>,
    pub discount_percentage: Option<Decimal>,
    pub start_date: String,
    pub end_date: String,
    pub is_active: Option<bool>,
}

impl Promotion {
    #[must_use]
    pub fn active(&self) -> bool {
        self.is_active.unwrap_or(false)
    }

    /// Human-rendered discount, whichever column is populated.
    #[must_use]
    pub fn discount_label(&self) -> String {
        if let Some(percentage) = self.discount_percentage {
            return format!("{percentage}% off");
        }
        if let Some(amount) = self.discount_amount {
            return format!("{amount} off");
        }
        "Special offer".to_string()
    }
}

/// A community discussion channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommunityChannel {
    pub id: ChannelId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
}

/// A post within a community channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommunityPost {
    pub id: CommunityPostId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub profiles: Option<AuthorProfile>,
}

impl CommunityPost {
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.profiles
            .as_ref()
            .and_then(|author| author.full_name.as_deref())
            .unwrap_or("Anonymous")
    }
}

/// A grocery store in the hub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroceryStore {
    pub id: GroceryStoreId,
    pub name: String,
    pub address: String,
    pub rating: Option<f32>,
    pub delivery_available: Option<bool>,
}

impl GroceryStore {
    #[must_use]
    pub fn delivers(&self) -> bool {
        self.delivery_available.unwrap_or(false)
    }
}

/// A grocery item stocked by a store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroceryItem {
    pub id: GroceryItemId,
    pub store_id: GroceryStoreId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Price,
    pub in_stock: Option<bool>,
}

impl GroceryItem {
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.in_stock.unwrap_or(true)
    }
}

/// Name/price embed for cart lines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartLineItem {
    pub name: String,
    pub price: Price,
}

/// A line in a user's grocery cart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub item_id: GroceryItemId,
    pub quantity: u32,
    #[serde(default)]
    pub grocery_items: Option<CartLineItem>,
}

impl CartItem {
    #[must_use]
    pub fn item_name(&self) -> &str {
        self.grocery_items
            .as_ref()
            .map_or("(removed item)", |item| item.name.as_str())
    }

    #[must_use]
    pub fn line_total(&self) -> Price {
        self.grocery_items
            .as_ref()
            .map_or(Price::ZERO, |item| item.price.times(self.quantity))
    }
}

/// A marketplace service listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketplaceService {
    pub id: ServiceId,
    pub provider_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_range: String,
    pub availability: Option<bool>,
}

impl MarketplaceService {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.availability.unwrap_or(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn post_deserializes_with_embeds() {
        let post: Post = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "user_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "content": "Best ramen in town",
            "image_url": null,
            "type": "social",
            "created_at": "2024-06-01T12:00:00+00:00",
            "updated_at": "2024-06-01T12:00:00+00:00",
            "profiles": { "full_name": "Dana", "avatar_url": null },
            "likes": [{ "count": 3 }],
            "comments": [{ "count": 1 }],
        }))
        .unwrap();

        assert_eq!(post.author_name(), "Dana");
        assert_eq!(post.like_count(), 3);
        assert_eq!(post.comment_count(), 1);
    }

    #[test]
    fn post_counts_default_to_zero_without_embeds() {
        let post: Post = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "user_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "content": "hello",
            "image_url": null,
            "type": "social",
            "created_at": "2024-06-01T12:00:00Z",
        }))
        .unwrap();

        assert_eq!(post.author_name(), "Anonymous");
        assert_eq!(post.like_count(), 0);
        assert_eq!(post.comment_count(), 0);
    }

    #[test]
    fn nullable_order_status_defaults_to_pending() {
        let order: RestaurantOrder = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "customer_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "restaurant_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "status": null,
            "total_amount": 42.5,
            "notes": null,
            "created_at": "2024-06-01T12:00:00+00:00",
        }))
        .unwrap();

        assert_eq!(order.status_or_default(), OrderStatus::Pending);
        assert_eq!(order.total_amount.to_string(), "$42.50");
    }

    #[test]
    fn order_items_compute_line_totals() {
        let item: OrderItem = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "menu_item_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "quantity": 3,
            "unit_price": "4.25",
            "notes": null,
            "menu_items": { "name": "Garlic naan" },
        }))
        .unwrap();

        assert_eq!(item.item_name(), "Garlic naan");
        assert_eq!(item.line_total().to_string(), "$12.75");
    }

    #[test]
    fn reservation_parses_separate_date_and_time() {
        let reservation: Reservation = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "customer_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "restaurant_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "reservation_date": "2024-07-04",
            "reservation_time": "19:30:00",
            "party_size": 4,
            "status": "confirmed",
            "notes": "window seat",
        }))
        .unwrap();

        assert_eq!(reservation.status_or_default(), ReservationStatus::Confirmed);
        assert_eq!(reservation.reservation_date.to_string(), "2024-07-04");
        assert_eq!(reservation.reservation_time.to_string(), "19:30:00");
    }

    #[test]
    fn promotion_prefers_percentage_label() {
        let promotion: Promotion = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "restaurant_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "name": "Summer deal",
            "description": null,
            "discount_amount": null,
            "discount_percentage": 15,
            "start_date": "2024-06-01",
            "end_date": "2024-08-31",
            "is_active": true,
        }))
        .unwrap();

        assert_eq!(promotion.discount_label(), "15% off");
        assert!(promotion.active());
    }

    #[test]
    fn cart_item_totals_come_from_the_embed() {
        let line: CartItem = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "user_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "item_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "quantity": 2,
            "grocery_items": { "name": "Basil", "price": 2.5 },
        }))
        .unwrap();

        assert_eq!(line.item_name(), "Basil");
        assert_eq!(line.line_total().to_string(), "$5.00");
    }
}
