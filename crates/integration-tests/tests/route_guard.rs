//! Route guard integration tests.
//!
//! Covers the session-to-page rules:
//! - Anonymous visitors are sent to the sign-in page for the area they hit
//! - Each role is bounced from the other role's pages to its own home
//! - Public pages render without a session
//! - Owners without a restaurant land on settings until one exists
//!
//! Run with:
//! ```bash
//! cargo test -p plateful-integration-tests --test route_guard
//! ```

use plateful_integration_tests::{TestApp, location, restaurant_row, unique_email};
use uuid::Uuid;

#[tokio::test]
async fn anonymous_dashboard_visit_redirects_to_owner_sign_in() {
    let app = TestApp::spawn().await;

    let response = app.get("/dashboard").await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth?mode=sign-in&type=restaurant_owner");
}

#[tokio::test]
async fn anonymous_customer_visit_redirects_to_customer_sign_in() {
    let app = TestApp::spawn().await;

    let response = app.get("/customer/home").await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth?mode=sign-in&type=customer");
}

#[tokio::test]
async fn public_pages_render_without_a_session() {
    let app = TestApp::spawn().await;

    for path in ["/", "/privacy", "/terms", "/health", "/health/ready"] {
        let response = app.get(path).await;
        assert_eq!(response.status(), 200, "{path} should be public");
    }
}

#[tokio::test]
async fn customer_is_bounced_from_the_owner_dashboard() {
    let app = TestApp::spawn().await;
    let response = app.sign_up_customer(&unique_email("guard-customer")).await;
    assert_eq!(location(&response), "/customer/home");

    let response = app.get("/dashboard").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/customer/home");

    let response = app.get("/customer/home").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn owner_is_bounced_from_customer_pages() {
    let app = TestApp::spawn().await;
    let response = app.sign_up_owner(&unique_email("guard-owner")).await;
    assert_eq!(location(&response), "/dashboard");

    let response = app.get("/customer/home").await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn owner_without_a_restaurant_lands_on_settings() {
    let app = TestApp::spawn().await;
    app.sign_up_owner(&unique_email("new-owner")).await;

    let response = app.get("/dashboard").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/dashboard/settings");

    let response = app.get("/dashboard/settings").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn owner_with_a_restaurant_sees_the_dashboard() {
    let app = TestApp::spawn().await;
    let email = unique_email("seated-owner");
    app.sign_up_owner(&email).await;

    let owner_id = app.platform.user_id(&email).expect("owner account");
    app.platform.seed(
        "restaurants",
        restaurant_row(Uuid::new_v4(), owner_id, "Juniper Counter"),
    );

    let response = app.get("/dashboard").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.expect("read dashboard body");
    assert!(body.contains("Juniper Counter"));
}

#[tokio::test]
async fn auth_page_redirects_signed_in_users_home() {
    let app = TestApp::spawn().await;
    app.sign_up_customer(&unique_email("signed-in")).await;

    let response = app.get("/auth?mode=sign-in").await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/customer/home");
}
