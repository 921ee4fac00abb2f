//! Fetchers that load cache values from the backend.
//!
//! The cache itself is fetch-agnostic: it drives any [`QueryFetcher`].
//! [`SupabaseFetcher`] is the production implementation, mapping each
//! [`QueryKey`] onto one table read (plus the follow-list lookup for the
//! following feed).

use async_trait::async_trait;
use plateful_core::{FeedKind, UserId};

use crate::supabase::records::{Post, UserFollow};
use crate::supabase::{SupabaseClient, SupabaseError};

use super::key::QueryKey;
use super::value::CacheValue;

/// Loads the value behind a cache key.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<CacheValue, SupabaseError>;
}

/// Feed pages are capped; older posts fall off the bottom.
const FEED_PAGE_SIZE: u32 = 20;

const POST_COLUMNS: &str = "id,user_id,content,image_url,type,created_at,\
     profiles!posts_user_id_fkey(full_name,avatar_url),likes(count),comments(count)";
const COMMENT_COLUMNS: &str = "id,post_id,user_id,content,created_at,\
     profiles(full_name,avatar_url)";
const ORDER_COLUMNS: &str = "id,customer_id,restaurant_id,status,total_amount,notes,created_at,\
     order_items(id,menu_item_id,quantity,unit_price,notes,menu_items(name))";
const COMMUNITY_POST_COLUMNS: &str = "id,channel_id,user_id,title,content,created_at,\
     profiles(full_name,avatar_url)";
const CART_COLUMNS: &str = "id,user_id,item_id,quantity,grocery_items(name,price)";

/// Production fetcher backed by the platform table API.
///
/// Reads go through the service-role client; row access is scoped by the
/// route guards in front of every read, not by user tokens.
#[derive(Clone)]
pub struct SupabaseFetcher {
    client: SupabaseClient,
}

impl SupabaseFetcher {
    #[must_use]
    pub const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn fetch_posts(
        &self,
        feed: FeedKind,
        viewer: Option<UserId>,
    ) -> Result<CacheValue, SupabaseError> {
        let mut query = self
            .client
            .table("posts")
            .select(POST_COLUMNS)
            .order_desc("created_at")
            .limit(FEED_PAGE_SIZE);

        if feed == FeedKind::Following {
            let Some(viewer) = viewer else {
                return Ok(CacheValue::Posts(Vec::new()));
            };
            let follows: Vec<UserFollow> = self
                .client
                .table("user_follows")
                .select("following_id")
                .eq("follower_id", viewer)
                .fetch()
                .await?;
            let followed: Vec<UserId> =
                follows.into_iter().map(|row| row.following_id).collect();
            // An empty follow list matches nothing; it must not fall back
            // to the global feed.
            query = query.in_list("user_id", &followed);
        }

        let mut posts: Vec<Post> = query.fetch().await?;
        if feed == FeedKind::Trending {
            rank_by_likes(&mut posts);
        }
        Ok(CacheValue::Posts(posts))
    }
}

#[async_trait]
impl QueryFetcher for SupabaseFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<CacheValue, SupabaseError> {
        match key {
            QueryKey::Posts { feed, viewer } => self.fetch_posts(*feed, *viewer).await,
            QueryKey::Comments { post } => {
                let comments = self
                    .client
                    .table("comments")
                    .select(COMMENT_COLUMNS)
                    .eq("post_id", post)
                    .order_asc("created_at")
                    .fetch()
                    .await?;
                Ok(CacheValue::Comments(comments))
            }
            QueryKey::Restaurants { search } => {
                let mut query = self.client.table("restaurants").order_asc("name");
                if let Some(needle) = search {
                    query = query.ilike("name", needle);
                }
                Ok(CacheValue::Restaurants(query.fetch().await?))
            }
            QueryKey::OwnerRestaurant { owner } => {
                let restaurant = self
                    .client
                    .table("restaurants")
                    .eq("owner_id", owner)
                    .fetch_optional()
                    .await?;
                Ok(CacheValue::OwnerRestaurant(restaurant.map(Box::new)))
            }
            QueryKey::MenuCategories { restaurant } => {
                let categories = self
                    .client
                    .table("menu_categories")
                    .eq("restaurant_id", restaurant)
                    .order_asc("name")
                    .fetch()
                    .await?;
                Ok(CacheValue::MenuCategories(categories))
            }
            QueryKey::MenuItems { restaurant } => {
                let items = self
                    .client
                    .table("menu_items")
                    .select("*,menu_categories(name)")
                    .eq("restaurant_id", restaurant)
                    .order_asc("name")
                    .fetch()
                    .await?;
                Ok(CacheValue::MenuItems(items))
            }
            QueryKey::Orders { restaurant } => {
                let orders = self
                    .client
                    .table("orders")
                    .select(ORDER_COLUMNS)
                    .eq("restaurant_id", restaurant)
                    .order_desc("created_at")
                    .fetch()
                    .await?;
                Ok(CacheValue::Orders(orders))
            }
            QueryKey::Reservations { restaurant } => {
                let reservations = self
                    .client
                    .table("reservations")
                    .eq("restaurant_id", restaurant)
                    .order_asc("reservation_date")
                    .order_asc("reservation_time")
                    .fetch()
                    .await?;
                Ok(CacheValue::Reservations(reservations))
            }
            QueryKey::Promotions { restaurant } => {
                let promotions = self
                    .client
                    .table("promotions")
                    .eq("restaurant_id", restaurant)
                    .order_desc("created_at")
                    .fetch()
                    .await?;
                Ok(CacheValue::Promotions(promotions))
            }
            QueryKey::Channels => {
                let channels = self
                    .client
                    .table("community_channels")
                    .order_asc("name")
                    .fetch()
                    .await?;
                Ok(CacheValue::Channels(channels))
            }
            QueryKey::ChannelPosts { channel } => {
                let posts = self
                    .client
                    .table("community_posts")
                    .select(COMMUNITY_POST_COLUMNS)
                    .eq("channel_id", channel)
                    .order_desc("created_at")
                    .fetch()
                    .await?;
                Ok(CacheValue::CommunityPosts(posts))
            }
            QueryKey::GroceryStores => {
                let stores = self
                    .client
                    .table("grocery_stores")
                    .order_asc("name")
                    .fetch()
                    .await?;
                Ok(CacheValue::GroceryStores(stores))
            }
            QueryKey::GroceryItems { store } => {
                let items = self
                    .client
                    .table("grocery_items")
                    .eq("store_id", store)
                    .order_asc("category")
                    .order_asc("name")
                    .fetch()
                    .await?;
                Ok(CacheValue::GroceryItems(items))
            }
            QueryKey::MarketplaceServices => {
                let services = self
                    .client
                    .table("marketplace_services")
                    .order_desc("created_at")
                    .fetch()
                    .await?;
                Ok(CacheValue::Services(services))
            }
            QueryKey::Profile { user } => {
                let profile = self
                    .client
                    .table("profiles")
                    .eq("id", user)
                    .fetch_one()
                    .await?;
                Ok(CacheValue::Profile(Box::new(profile)))
            }
            QueryKey::CartItems { user } => {
                let items = self
                    .client
                    .table("shopping_cart")
                    .select(CART_COLUMNS)
                    .eq("user_id", user)
                    .order_desc("created_at")
                    .fetch()
                    .await?;
                Ok(CacheValue::CartItems(items))
            }
        }
    }
}

/// Order a feed page by like count. The backend cannot order by an
/// embedded aggregate, so trending is ranked here; the sort is stable,
/// keeping newest-first within equal counts.
fn rank_by_likes(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.like_count().cmp(&a.like_count()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn post(likes: i64, content: &str) -> Post {
        serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "user_id": uuid::Uuid::new_v4(),
            "content": content,
            "image_url": null,
            "type": "social",
            "created_at": "2024-06-01T12:00:00Z",
            "likes": [{ "count": likes }],
        }))
        .unwrap()
    }

    #[test]
    fn trending_ranks_by_like_count() {
        let mut posts = vec![post(1, "newest"), post(9, "older"), post(1, "oldest")];
        rank_by_likes(&mut posts);

        let order: Vec<&str> = posts.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(order, ["older", "newest", "oldest"]);
    }

    #[tokio::test]
    async fn following_feed_without_viewer_is_empty() {
        let config = crate::config::SupabaseConfig {
            url: url::Url::parse("http://localhost:54321").unwrap(),
            anon_key: "test-anon-key".to_string(),
            service_role_key: secrecy::SecretString::from("test-service-key"),
        };
        let fetcher = SupabaseFetcher::new(SupabaseClient::new(&config));

        let value = fetcher
            .fetch(&QueryKey::Posts {
                feed: FeedKind::Following,
                viewer: None,
            })
            .await
            .unwrap();

        assert!(value.into_posts().unwrap().is_empty());
    }
}
