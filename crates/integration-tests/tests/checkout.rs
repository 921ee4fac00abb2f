//! Checkout integration tests.
//!
//! The checkout pages run in test mode end to end: the widget client id
//! comes from the platform's `payment-config` function, the approve and
//! error callbacks only redirect, and nothing is ever written.
//!
//! Run with:
//! ```bash
//! cargo test -p plateful-integration-tests --test checkout
//! ```

use plateful_integration_tests::{TestApp, location};

#[tokio::test]
async fn widget_renders_with_the_configured_client_id() {
    let app = TestApp::spawn().await;
    app.platform.set_payment_client_id("client-abc123");

    let response = app.get("/checkout/pro").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("read checkout body");
    assert!(body.contains("client-abc123"), "widget mount should carry the client id");
}

#[tokio::test]
async fn missing_client_id_disables_the_widget() {
    let app = TestApp::spawn().await;

    let response = app.get("/checkout/pro").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("read checkout body");
    assert!(body.contains("The payment widget is unavailable right now"));
}

#[tokio::test]
async fn approved_payment_redirects_back_with_success() {
    let app = TestApp::spawn().await;
    app.platform.set_payment_client_id("client-abc123");

    let response = app
        .post_form("/checkout/pro/approve?billing=annual", &[("order_ref", "W-1001")])
        .await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/checkout/pro?billing=annual&success=1");
    assert_eq!(app.platform.total_write_count(), 0, "test payments must never write");
}

#[tokio::test]
async fn widget_error_redirects_back_with_an_error_flag() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/checkout/starter/error", &[("message", "card declined")])
        .await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/checkout/starter?billing=monthly&error=1");
    assert_eq!(app.platform.total_write_count(), 0);
}

#[tokio::test]
async fn unknown_plans_are_not_found() {
    let app = TestApp::spawn().await;

    let response = app.get("/checkout/platinum").await;

    assert_eq!(response.status(), 404);
}
