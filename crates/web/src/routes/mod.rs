//! HTTP route handlers for the web application.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Landing page (hero, features, pricing)
//! GET  /privacy                 - Privacy policy
//! GET  /terms                   - Terms of service
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (platform reachable)
//!
//! # Auth
//! GET  /auth                    - Sign-in / sign-up page (?mode=&type=)
//! POST /auth/sign-in            - Sign in
//! POST /auth/sign-up            - Create an account
//! POST /auth/sign-out           - Sign out (revokes the platform session)
//!
//! # Checkout (experimental)
//! GET  /checkout/{plan}         - Hosted payment widget page (?billing=)
//! POST /checkout/{plan}/approve - Record an approved payment
//! POST /checkout/{plan}/error   - Record a failed payment
//!
//! # Owner dashboard (requires restaurant_owner)
//! GET  /dashboard               - Overview
//! GET  /dashboard/menu          - Menu management
//! POST /dashboard/menu/categories        - Add category
//! POST /dashboard/menu/items             - Add item
//! POST /dashboard/menu/items/{id}        - Update item
//! POST /dashboard/menu/items/{id}/delete - Delete item
//! GET  /dashboard/orders        - Order management
//! POST /dashboard/orders/{id}/status     - Update order status
//! GET  /dashboard/reservations  - Reservation management
//! POST /dashboard/reservations/{id}/status - Update reservation status
//! GET  /dashboard/marketing     - Promotions
//! POST /dashboard/marketing/promotions   - Create promotion
//! GET  /dashboard/settings      - Restaurant profile
//! POST /dashboard/settings      - Create or update the restaurant
//!
//! # Customer app (requires customer)
//! GET  /customer/home           - Social feed (?tab=for-you|trending|following)
//! GET  /customer/home/feed      - Feed fragment for live refresh
//! GET  /customer/home/events    - SSE stream of feed cache events
//! POST /customer/posts          - Create post
//! GET  /customer/posts/{id}     - Post detail with comments
//! POST /customer/posts/{id}/like     - Toggle like
//! POST /customer/posts/{id}/comments - Add comment
//! GET  /customer/discover       - Restaurant discovery (?q=)
//! POST /customer/discover/{id}/feedback - Rate a restaurant
//! GET  /customer/directory      - Service marketplace directory
//! GET  /customer/marketplace    - Marketplace services
//! GET  /customer/grocery        - Grocery stores
//! GET  /customer/grocery/{id}   - Grocery store items
//! POST /customer/grocery/cart         - Add to cart
//! POST /customer/grocery/cart/remove  - Remove cart line
//! GET  /customer/communities    - Community channels
//! GET  /customer/communities/{id}     - Channel posts
//! POST /customer/communities/{id}/join  - Join channel (session-scoped)
//! POST /customer/communities/{id}/leave - Leave channel
//! POST /customer/communities/{id}/posts - Post to channel
//! GET  /customer/favorites      - Favorites (coming soon)
//! GET  /customer/messages       - Messages (coming soon)
//! GET  /customer/notifications  - Notifications
//! GET  /customer/profile        - Own profile
//! POST /customer/profile        - Update display name
//! GET  /customer/settings       - Account settings
//! ```

pub mod auth;
pub mod checkout;
pub mod customer;
pub mod health;
pub mod landing;
pub mod owner;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::auth_page))
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-out", post(auth::sign_out))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/{plan}", get(checkout::checkout_page))
        .route("/{plan}/approve", post(checkout::approve))
        .route("/{plan}/error", post(checkout::widget_error))
}

/// Create the owner dashboard router.
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(owner::overview::overview))
        .route("/menu", get(owner::menu::menu_page))
        .route("/menu/categories", post(owner::menu::create_category))
        .route("/menu/items", post(owner::menu::create_item))
        .route("/menu/items/{id}", post(owner::menu::update_item))
        .route("/menu/items/{id}/delete", post(owner::menu::delete_item))
        .route("/orders", get(owner::orders::orders_page))
        .route("/orders/{id}/status", post(owner::orders::update_status))
        .route("/reservations", get(owner::reservations::reservations_page))
        .route(
            "/reservations/{id}/status",
            post(owner::reservations::update_status),
        )
        .route("/marketing", get(owner::marketing::marketing_page))
        .route(
            "/marketing/promotions",
            post(owner::marketing::create_promotion),
        )
        .route(
            "/settings",
            get(owner::settings::settings_page).post(owner::settings::save_settings),
        )
}

/// Create the customer app router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(customer::home::home))
        .route("/home/feed", get(customer::home::feed_fragment))
        .route("/home/events", get(customer::home::feed_events))
        .route("/posts", post(customer::posts::create_post))
        .route("/posts/{id}", get(customer::posts::post_detail))
        .route("/posts/{id}/like", post(customer::posts::toggle_like))
        .route("/posts/{id}/comments", post(customer::posts::add_comment))
        .route("/discover", get(customer::discover::discover))
        .route(
            "/discover/{id}/feedback",
            post(customer::discover::submit_feedback),
        )
        .route("/directory", get(customer::directory::directory))
        .route("/marketplace", get(customer::marketplace::marketplace))
        .route("/grocery", get(customer::grocery::stores))
        .route("/grocery/cart", post(customer::grocery::add_to_cart))
        .route(
            "/grocery/cart/remove",
            post(customer::grocery::remove_cart_item),
        )
        .route("/grocery/{id}", get(customer::grocery::store_items))
        .route("/communities", get(customer::communities::channels))
        .route("/communities/{id}", get(customer::communities::channel))
        .route("/communities/{id}/join", post(customer::communities::join))
        .route(
            "/communities/{id}/leave",
            post(customer::communities::leave),
        )
        .route(
            "/communities/{id}/posts",
            post(customer::communities::create_post),
        )
        .route("/favorites", get(customer::placeholders::favorites))
        .route("/messages", get(customer::placeholders::messages))
        .route(
            "/notifications",
            get(customer::placeholders::notifications),
        )
        .route(
            "/profile",
            get(customer::profile::profile_page).post(customer::profile::update_profile),
        )
        .route("/settings", get(customer::profile::settings_page))
}

/// Create the full application router with middleware applied.
///
/// The Sentry layers are attached by the binary so tests can build the
/// app without a Sentry client.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/", get(landing::landing))
        .route("/privacy", get(landing::privacy))
        .route("/terms", get(landing::terms))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/checkout", checkout_routes())
        .nest("/dashboard", owner_routes())
        .nest("/customer", customer_routes())
        .nest_service("/static", ServeDir::new("crates/web/static"))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
