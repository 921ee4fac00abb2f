//! Cache keys and invalidation families.
//!
//! A [`QueryKey`] names one cached read exactly (feed tab, restaurant,
//! search string). Writes and realtime change notices do not know which
//! keys exist, so they invalidate a whole [`ResourceFamily`]; every key
//! maps to the family that owns its backing table.

use plateful_core::{ChannelId, FeedKind, GroceryStoreId, PostId, RestaurantId, UserId};

/// Key identifying one cached read.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    /// One tab of the social feed. `viewer` is set only for the
    /// following feed, which is scoped to who the viewer follows.
    Posts {
        feed: FeedKind,
        viewer: Option<UserId>,
    },
    /// Comments under a single post.
    Comments { post: PostId },
    /// The public restaurant directory, optionally filtered by search.
    Restaurants { search: Option<String> },
    /// The restaurant owned by one dashboard user.
    OwnerRestaurant { owner: UserId },
    MenuCategories { restaurant: RestaurantId },
    MenuItems { restaurant: RestaurantId },
    Orders { restaurant: RestaurantId },
    Reservations { restaurant: RestaurantId },
    Promotions { restaurant: RestaurantId },
    /// All community channels.
    Channels,
    /// Posts within one community channel.
    ChannelPosts { channel: ChannelId },
    GroceryStores,
    GroceryItems { store: GroceryStoreId },
    MarketplaceServices,
    Profile { user: UserId },
    CartItems { user: UserId },
}

impl QueryKey {
    /// The invalidation family this key belongs to.
    #[must_use]
    pub const fn family(&self) -> ResourceFamily {
        match self {
            Self::Posts { .. } => ResourceFamily::Posts,
            Self::Comments { .. } => ResourceFamily::Comments,
            Self::Restaurants { .. } | Self::OwnerRestaurant { .. } => ResourceFamily::Restaurants,
            Self::MenuCategories { .. } => ResourceFamily::MenuCategories,
            Self::MenuItems { .. } => ResourceFamily::MenuItems,
            Self::Orders { .. } => ResourceFamily::Orders,
            Self::Reservations { .. } => ResourceFamily::Reservations,
            Self::Promotions { .. } => ResourceFamily::Promotions,
            Self::Channels => ResourceFamily::Channels,
            Self::ChannelPosts { .. } => ResourceFamily::CommunityPosts,
            Self::GroceryStores => ResourceFamily::GroceryStores,
            Self::GroceryItems { .. } => ResourceFamily::GroceryItems,
            Self::MarketplaceServices => ResourceFamily::Services,
            Self::Profile { .. } => ResourceFamily::Profiles,
            Self::CartItems { .. } => ResourceFamily::Cart,
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Posts { feed, viewer: None } => write!(f, "posts:{feed}"),
            Self::Posts {
                feed,
                viewer: Some(viewer),
            } => write!(f, "posts:{feed}:{viewer}"),
            Self::Comments { post } => write!(f, "comments:{post}"),
            Self::Restaurants { search: None } => write!(f, "restaurants:all"),
            Self::Restaurants {
                search: Some(search),
            } => write!(f, "restaurants:search:{search}"),
            Self::OwnerRestaurant { owner } => write!(f, "owner-restaurant:{owner}"),
            Self::MenuCategories { restaurant } => write!(f, "menu-categories:{restaurant}"),
            Self::MenuItems { restaurant } => write!(f, "menu-items:{restaurant}"),
            Self::Orders { restaurant } => write!(f, "orders:{restaurant}"),
            Self::Reservations { restaurant } => write!(f, "reservations:{restaurant}"),
            Self::Promotions { restaurant } => write!(f, "promotions:{restaurant}"),
            Self::Channels => write!(f, "channels"),
            Self::ChannelPosts { channel } => write!(f, "channel-posts:{channel}"),
            Self::GroceryStores => write!(f, "grocery-stores"),
            Self::GroceryItems { store } => write!(f, "grocery-items:{store}"),
            Self::MarketplaceServices => write!(f, "services"),
            Self::Profile { user } => write!(f, "profile:{user}"),
            Self::CartItems { user } => write!(f, "cart:{user}"),
        }
    }
}

/// A group of keys invalidated together after a write.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ResourceFamily {
    Posts,
    Comments,
    Restaurants,
    MenuCategories,
    MenuItems,
    Orders,
    Reservations,
    Promotions,
    Channels,
    CommunityPosts,
    GroceryStores,
    GroceryItems,
    Services,
    Profiles,
    Cart,
}

impl ResourceFamily {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Restaurants => "restaurants",
            Self::MenuCategories => "menu-categories",
            Self::MenuItems => "menu-items",
            Self::Orders => "orders",
            Self::Reservations => "reservations",
            Self::Promotions => "promotions",
            Self::Channels => "channels",
            Self::CommunityPosts => "community-posts",
            Self::GroceryStores => "grocery-stores",
            Self::GroceryItems => "grocery-items",
            Self::Services => "services",
            Self::Profiles => "profiles",
            Self::Cart => "cart",
        }
    }
}

impl std::fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Families touched when a backend table changes.
///
/// Used by the realtime listener: a change notice names only the table, and
/// every cached read that could include rows from that table must go stale.
/// Likes and comments feed into post aggregate counts, so they invalidate
/// the posts family too.
#[must_use]
pub fn families_for_table(table: &str) -> &'static [ResourceFamily] {
    match table {
        "posts" | "likes" => &[ResourceFamily::Posts],
        "comments" => &[ResourceFamily::Comments, ResourceFamily::Posts],
        "restaurants" => &[ResourceFamily::Restaurants],
        "menu_categories" => &[ResourceFamily::MenuCategories],
        "menu_items" => &[ResourceFamily::MenuItems],
        "orders" | "order_items" => &[ResourceFamily::Orders],
        "reservations" => &[ResourceFamily::Reservations],
        "promotions" => &[ResourceFamily::Promotions],
        "community_channels" => &[ResourceFamily::Channels],
        "community_posts" => &[ResourceFamily::CommunityPosts],
        "grocery_stores" => &[ResourceFamily::GroceryStores],
        "grocery_items" => &[ResourceFamily::GroceryItems],
        "marketplace_services" => &[ResourceFamily::Services],
        "profiles" => &[ResourceFamily::Profiles],
        "shopping_cart" => &[ResourceFamily::Cart],
        _ => &[],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_distinguishes_feed_tabs_and_viewers() {
        let viewer = UserId::new();
        let for_you = QueryKey::Posts {
            feed: FeedKind::ForYou,
            viewer: None,
        };
        let following = QueryKey::Posts {
            feed: FeedKind::Following,
            viewer: Some(viewer),
        };

        assert_eq!(for_you.to_string(), "posts:for-you");
        assert_eq!(following.to_string(), format!("posts:following:{viewer}"));
        assert_ne!(for_you, following);
    }

    #[test]
    fn owner_restaurant_shares_the_restaurants_family() {
        let owner = UserId::new();
        assert_eq!(
            QueryKey::OwnerRestaurant { owner }.family(),
            ResourceFamily::Restaurants
        );
        assert_eq!(
            QueryKey::Restaurants { search: None }.family(),
            ResourceFamily::Restaurants
        );
    }

    #[test]
    fn comment_changes_touch_posts_too() {
        assert_eq!(
            families_for_table("comments"),
            &[ResourceFamily::Comments, ResourceFamily::Posts]
        );
        assert_eq!(families_for_table("likes"), &[ResourceFamily::Posts]);
    }

    #[test]
    fn unknown_tables_touch_nothing() {
        assert!(families_for_table("audit_log").is_empty());
        assert!(families_for_table("").is_empty());
    }

    #[test]
    fn every_key_maps_into_its_table_families() {
        let restaurant = RestaurantId::new();
        let cases = [
            (QueryKey::Orders { restaurant }, "order_items"),
            (QueryKey::MenuItems { restaurant }, "menu_items"),
            (QueryKey::Channels, "community_channels"),
            (
                QueryKey::CartItems {
                    user: UserId::new(),
                },
                "shopping_cart",
            ),
        ];

        for (key, table) in cases {
            assert!(
                families_for_table(table).contains(&key.family()),
                "{key} should be invalidated by {table} changes"
            );
        }
    }
}
