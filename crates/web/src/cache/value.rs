//! Cached value types.
//!
//! Every fetch result is stored as one [`CacheValue`] variant. Route
//! handlers know which variant a key produces and unwrap it with the
//! typed accessors; a mismatch is a programming error surfaced as
//! [`CacheError::Shape`] rather than a panic.

use crate::supabase::records::{
    CartItem, Comment, CommunityChannel, CommunityPost, GroceryItem, GroceryStore,
    MarketplaceService, MenuCategory, MenuItem, Post, Profile, Promotion, Reservation, Restaurant,
    RestaurantOrder,
};

use super::CacheError;

/// One cached fetch result.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Posts(Vec<Post>),
    Comments(Vec<Comment>),
    Restaurants(Vec<Restaurant>),
    /// The dashboard user's restaurant; `None` until they create one.
    OwnerRestaurant(Option<Box<Restaurant>>),
    MenuCategories(Vec<MenuCategory>),
    MenuItems(Vec<MenuItem>),
    Orders(Vec<RestaurantOrder>),
    Reservations(Vec<Reservation>),
    Promotions(Vec<Promotion>),
    Channels(Vec<CommunityChannel>),
    CommunityPosts(Vec<CommunityPost>),
    GroceryStores(Vec<GroceryStore>),
    GroceryItems(Vec<GroceryItem>),
    Services(Vec<MarketplaceService>),
    Profile(Box<Profile>),
    CartItems(Vec<CartItem>),
}

macro_rules! typed_accessor {
    ($method:ident, $variant:ident, $ty:ty) => {
        /// Unwrap this value as the expected variant.
        ///
        /// # Errors
        ///
        /// Returns [`CacheError::Shape`] if the value holds a different
        /// variant, which means a key was read with the wrong accessor.
        pub fn $method(self) -> Result<$ty, CacheError> {
            match self {
                Self::$variant(value) => Ok(value),
                other => Err(CacheError::Shape {
                    expected: stringify!($variant),
                    found: other.kind(),
                }),
            }
        }
    };
}

impl CacheValue {
    /// Variant name, for logs and shape errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Posts(_) => "Posts",
            Self::Comments(_) => "Comments",
            Self::Restaurants(_) => "Restaurants",
            Self::OwnerRestaurant(_) => "OwnerRestaurant",
            Self::MenuCategories(_) => "MenuCategories",
            Self::MenuItems(_) => "MenuItems",
            Self::Orders(_) => "Orders",
            Self::Reservations(_) => "Reservations",
            Self::Promotions(_) => "Promotions",
            Self::Channels(_) => "Channels",
            Self::CommunityPosts(_) => "CommunityPosts",
            Self::GroceryStores(_) => "GroceryStores",
            Self::GroceryItems(_) => "GroceryItems",
            Self::Services(_) => "Services",
            Self::Profile(_) => "Profile",
            Self::CartItems(_) => "CartItems",
        }
    }

    typed_accessor!(into_posts, Posts, Vec<Post>);
    typed_accessor!(into_comments, Comments, Vec<Comment>);
    typed_accessor!(into_restaurants, Restaurants, Vec<Restaurant>);
    typed_accessor!(into_owner_restaurant, OwnerRestaurant, Option<Box<Restaurant>>);
    typed_accessor!(into_menu_categories, MenuCategories, Vec<MenuCategory>);
    typed_accessor!(into_menu_items, MenuItems, Vec<MenuItem>);
    typed_accessor!(into_orders, Orders, Vec<RestaurantOrder>);
    typed_accessor!(into_reservations, Reservations, Vec<Reservation>);
    typed_accessor!(into_promotions, Promotions, Vec<Promotion>);
    typed_accessor!(into_channels, Channels, Vec<CommunityChannel>);
    typed_accessor!(into_community_posts, CommunityPosts, Vec<CommunityPost>);
    typed_accessor!(into_grocery_stores, GroceryStores, Vec<GroceryStore>);
    typed_accessor!(into_grocery_items, GroceryItems, Vec<GroceryItem>);
    typed_accessor!(into_services, Services, Vec<MarketplaceService>);
    typed_accessor!(into_profile, Profile, Box<Profile>);
    typed_accessor!(into_cart_items, CartItems, Vec<CartItem>);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accessor_returns_the_matching_variant() {
        let value = CacheValue::Channels(Vec::new());
        assert!(value.into_channels().unwrap().is_empty());
    }

    #[test]
    fn accessor_reports_shape_mismatch() {
        let value = CacheValue::Posts(Vec::new());
        let error = value.into_comments().unwrap_err();
        assert_eq!(
            error,
            CacheError::Shape {
                expected: "Comments",
                found: "Posts",
            }
        );
    }

    #[test]
    fn owner_restaurant_can_hold_none() {
        let value = CacheValue::OwnerRestaurant(None);
        assert!(value.into_owner_restaurant().unwrap().is_none());
    }
}
