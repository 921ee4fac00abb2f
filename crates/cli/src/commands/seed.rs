//! Demo content seeding.
//!
//! Populates a project with enough content to walk through every surface
//! of the app: a restaurant with a menu, community channels with starter
//! threads, a couple of feed posts, grocery stores with stocked shelves,
//! and marketplace listings. Writes run under the service-role key;
//! sections that already have content are left alone, so re-running is
//! safe.
//!
//! # Usage
//!
//! ```bash
//! # The restaurant needs an owner account to hang off of
//! plateful account create -e owner@example.com -n "Demo Owner" -r restaurant_owner -p <password>
//!
//! plateful seed --owner-email owner@example.com
//! ```
//!
//! # Environment Variables
//!
//! Reads the same variables as the web server; `SUPABASE_SERVICE_ROLE_KEY`
//! must belong to the target project.

use plateful_core::{RestaurantId, UserId};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use plateful_web::config::{AppConfig, ConfigError};
use plateful_web::supabase::records::{
    CommunityChannel, GroceryStore, MarketplaceService, MenuCategory, MenuItem, Post, Profile,
    Restaurant,
};
use plateful_web::supabase::{SupabaseClient, SupabaseError};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Configuration failed to load.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A platform read or write failed.
    #[error("platform error: {0}")]
    Platform(#[from] SupabaseError),

    /// The owner account does not exist yet.
    #[error("no profile found for {0}; create the account first with `plateful account create`")]
    UnknownOwner(String),
}

/// The demo restaurant's menu: categories with their dishes.
const MENU: &[(&str, &[(&str, &str, f64)])] = &[
    (
        "Starters",
        &[
            ("Crispy spring rolls", "Hand-rolled, with sweet chili dip", 6.5),
            ("Tom yum soup", "Lemongrass broth, prawns, straw mushrooms", 8.0),
        ],
    ),
    (
        "Mains",
        &[
            ("Pad thai", "Rice noodles, tamarind, crushed peanuts", 14.5),
            ("Green curry", "Coconut milk, thai basil, bamboo shoots", 15.0),
            ("Basil fried rice", "Jasmine rice, holy basil, fried egg", 13.0),
        ],
    ),
    (
        "Desserts",
        &[("Mango sticky rice", "Ripe mango, coconut cream", 7.5)],
    ),
];

/// Community channels, each with a starter thread.
const CHANNELS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "Home Cooking",
        "Swap weeknight recipes and kitchen wins",
        "cooking",
        "What's on your stove tonight?",
        "Kick things off: share the dish you keep coming back to and the one trick that makes it work.",
    ),
    (
        "Restaurant Finds",
        "Hidden gems and honest reviews",
        "dining",
        "Best meal under twenty bucks",
        "Name the place, the dish, and why it beats everything twice the price.",
    ),
    (
        "Healthy Eating",
        "Meal prep, macros, and balance",
        "wellness",
        "Sunday prep that survives to Friday",
        "Looking for prep-ahead meals that still taste good on day five. What holds up for you?",
    ),
];

/// Feed posts published by the owner account.
const POSTS: &[&str] = &[
    "Opening week at Tamarind Grove went better than we dared hope. Thanks to everyone who came by!",
    "New on the menu this week: basil fried rice with a crispy egg. Come tell us what you think.",
];

/// Grocery stores and their shelves.
const STORES: &[(&str, &str, f64, bool, &[(&str, &str, &str, f64)])] = &[
    (
        "Fresh Fields Market",
        "88 Orchard Road",
        4.6,
        true,
        &[
            ("Thai basil", "Bunched, picked daily", "Produce", 2.5),
            ("Jasmine rice (2 lb)", "Fragrant long grain", "Pantry", 5.0),
            ("Coconut milk", "Full fat, unsweetened", "Pantry", 2.25),
        ],
    ),
    (
        "Corner Pantry",
        "5 Mill Lane",
        4.2,
        false,
        &[
            ("Fish sauce", "First press, small batch", "Pantry", 4.75),
            ("Bird's eye chilies", "Hot. Really.", "Produce", 1.5),
        ],
    ),
];

/// Marketplace listings attributed to the owner account.
const SERVICES: &[(&str, &str, &str, &str)] = &[
    (
        "Private chef for dinner parties",
        "Four-course menus built around what's in season, cooked in your kitchen.",
        "Catering",
        "$$$",
    ),
    (
        "Knife sharpening",
        "Drop off dull, pick up dangerous. Two-day turnaround.",
        "Kitchen services",
        "$",
    ),
];

/// Seed demo content, reusing whatever already exists.
///
/// # Errors
///
/// Returns `SeedError` if configuration cannot be loaded, the owner
/// account is missing, or a platform write fails.
pub async fn run(owner_email: &str) -> Result<(), SeedError> {
    let config = AppConfig::from_env()?;
    let client = SupabaseClient::with_service_role(&config.supabase);

    let owner: Option<Profile> = client
        .table("profiles")
        .select("*")
        .eq("email", owner_email)
        .fetch_optional()
        .await?;
    let owner = owner.ok_or_else(|| SeedError::UnknownOwner(owner_email.to_string()))?;

    info!("Seeding demo content as {} ({})", owner.display_name(), owner.id);

    let restaurant = ensure_restaurant(&client, owner.id).await?;
    let menu = seed_menu(&client, restaurant).await?;
    let community = seed_channels(&client, owner.id).await?;
    let posts = seed_posts(&client, owner.id).await?;
    let grocery = seed_grocery(&client).await?;
    let services = seed_services(&client, owner.id).await?;

    info!("Seeding complete!");
    info!("  Menu rows: {menu}");
    info!("  Community rows: {community}");
    info!("  Feed posts: {posts}");
    info!("  Grocery rows: {grocery}");
    info!("  Marketplace listings: {services}");

    Ok(())
}

/// The web app assumes at most one restaurant per owner, so reuse an
/// existing one rather than inserting a second.
async fn ensure_restaurant(
    client: &SupabaseClient,
    owner: UserId,
) -> Result<RestaurantId, SeedError> {
    let existing: Option<Restaurant> = client
        .table("restaurants")
        .select("*")
        .eq("owner_id", owner)
        .fetch_optional()
        .await?;
    if let Some(restaurant) = existing {
        info!("Reusing restaurant {} ({})", restaurant.name, restaurant.id);
        return Ok(restaurant.id);
    }

    let created: Restaurant = client
        .table("restaurants")
        .insert_returning(&json!({
            "owner_id": owner,
            "name": "Tamarind Grove",
            "description": "Family-run Thai kitchen. Small menu, big flavors.",
            "cuisine_type": "Thai",
            "address": "214 Pine Street",
            "phone": "(555) 014-0214",
            "email": "hello@tamarindgrove.example",
        }))
        .await?;
    info!("Created restaurant {} ({})", created.name, created.id);
    Ok(created.id)
}

async fn seed_menu(client: &SupabaseClient, restaurant: RestaurantId) -> Result<usize, SeedError> {
    let existing: Option<MenuItem> = client
        .table("menu_items")
        .select("*")
        .eq("restaurant_id", restaurant)
        .fetch_optional()
        .await?;
    if existing.is_some() {
        info!("Menu already populated, skipping");
        return Ok(0);
    }

    let mut rows = 0;
    for (category_name, dishes) in MENU {
        let category: MenuCategory = client
            .table("menu_categories")
            .insert_returning(&json!({
                "restaurant_id": restaurant,
                "name": category_name,
            }))
            .await?;
        rows += 1;

        for (name, description, price) in *dishes {
            client
                .table("menu_items")
                .insert(&json!({
                    "restaurant_id": restaurant,
                    "category_id": category.id,
                    "name": name,
                    "description": description,
                    "price": price,
                    "is_available": true,
                }))
                .await?;
            rows += 1;
        }
        info!("  {category_name}: {} dishes", dishes.len());
    }
    Ok(rows)
}

/// Insert the channels that are missing by name; each fresh channel gets
/// a starter thread so it doesn't open onto an empty room.
async fn seed_channels(client: &SupabaseClient, author: UserId) -> Result<usize, SeedError> {
    let existing: Vec<CommunityChannel> = client
        .table("community_channels")
        .select("*")
        .fetch()
        .await?;

    let mut rows = 0;
    for (name, description, category, title, content) in CHANNELS {
        if existing.iter().any(|channel| channel.name == *name) {
            continue;
        }

        let channel: CommunityChannel = client
            .table("community_channels")
            .insert_returning(&json!({
                "name": name,
                "description": description,
                "category": category,
            }))
            .await?;
        client
            .table("community_posts")
            .insert(&json!({
                "channel_id": channel.id,
                "user_id": author,
                "title": title,
                "content": content,
            }))
            .await?;
        info!("  Channel {name} created with a starter thread");
        rows += 2;
    }

    if rows == 0 {
        info!("Community channels already present, skipping");
    }
    Ok(rows)
}

async fn seed_posts(client: &SupabaseClient, author: UserId) -> Result<usize, SeedError> {
    let existing: Option<Post> = client
        .table("posts")
        .select("*")
        .eq("user_id", author)
        .fetch_optional()
        .await?;
    if existing.is_some() {
        info!("Author already has feed posts, skipping");
        return Ok(0);
    }

    for content in POSTS {
        client
            .table("posts")
            .insert(&json!({
                "user_id": author,
                "content": content,
                "image_url": null,
                "type": "social",
            }))
            .await?;
    }
    info!("  {} feed posts published", POSTS.len());
    Ok(POSTS.len())
}

async fn seed_grocery(client: &SupabaseClient) -> Result<usize, SeedError> {
    let existing: Vec<GroceryStore> = client
        .table("grocery_stores")
        .select("*")
        .fetch()
        .await?;

    let mut rows = 0;
    for (name, address, rating, delivers, shelf) in STORES {
        if existing.iter().any(|store| store.name == *name) {
            continue;
        }

        let store: GroceryStore = client
            .table("grocery_stores")
            .insert_returning(&json!({
                "name": name,
                "address": address,
                "rating": rating,
                "delivery_available": delivers,
            }))
            .await?;
        rows += 1;

        for (item, description, category, price) in *shelf {
            client
                .table("grocery_items")
                .insert(&json!({
                    "store_id": store.id,
                    "name": item,
                    "description": description,
                    "category": category,
                    "price": price,
                    "in_stock": true,
                }))
                .await?;
            rows += 1;
        }
        info!("  Store {name} stocked with {} items", shelf.len());
    }

    if rows == 0 {
        info!("Grocery stores already present, skipping");
    }
    Ok(rows)
}

async fn seed_services(client: &SupabaseClient, provider: UserId) -> Result<usize, SeedError> {
    let existing: Vec<MarketplaceService> = client
        .table("marketplace_services")
        .select("*")
        .fetch()
        .await?;

    let mut rows = 0;
    for (title, description, category, price_range) in SERVICES {
        if existing.iter().any(|service| service.title == *title) {
            continue;
        }

        client
            .table("marketplace_services")
            .insert(&json!({
                "provider_id": provider,
                "title": title,
                "description": description,
                "category": category,
                "price_range": price_range,
                "availability": true,
            }))
            .await?;
        info!("  Listed {title}");
        rows += 1;
    }

    if rows == 0 {
        info!("Marketplace listings already present, skipping");
    }
    Ok(rows)
}
