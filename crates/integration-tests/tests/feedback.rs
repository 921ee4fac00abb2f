//! Restaurant feedback flow tests.
//!
//! The feedback form on the discovery page follows the same shape as
//! every other form mutation: local validation short-circuits before any
//! platform traffic, a successful write redirects with a flash, and the
//! search term survives the round trip.
//!
//! Run with:
//! ```bash
//! cargo test -p plateful-integration-tests --test feedback
//! ```

use plateful_integration_tests::{TestApp, location, restaurant_row, unique_email};
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn submitted_feedback_is_written_and_flashes_on_discover() {
    let app = TestApp::spawn().await;
    let email = unique_email("regular");
    app.sign_up_customer(&email).await;

    let restaurant = Uuid::new_v4();
    app.platform
        .seed("restaurants", restaurant_row(restaurant, Uuid::new_v4(), "Golden Harvest"));

    let response = app
        .post_form(
            &format!("/customer/discover/{restaurant}/feedback"),
            &[
                ("q", "harvest"),
                ("rating", "4"),
                ("comment", "Ask for the window table"),
            ],
        )
        .await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/customer/discover?q=harvest&success=feedback");
    assert_eq!(app.platform.write_count("feedback"), 1);

    let rows = app.platform.rows("feedback");
    let row = rows.first().expect("feedback row written");
    let customer = app.platform.user_id(&email).expect("account registered");
    assert_eq!(
        row.get("customer_id").and_then(Value::as_str),
        Some(customer.to_string().as_str())
    );
    assert_eq!(
        row.get("restaurant_id").and_then(Value::as_str),
        Some(restaurant.to_string().as_str())
    );
    assert_eq!(row.get("rating").and_then(Value::as_u64), Some(4));
    assert_eq!(
        row.get("comment").and_then(Value::as_str),
        Some("Ask for the window table")
    );
}

#[tokio::test]
async fn out_of_range_rating_never_reaches_the_platform() {
    let app = TestApp::spawn().await;
    app.sign_up_customer(&unique_email("harsh-critic")).await;

    let restaurant = Uuid::new_v4();
    app.platform
        .seed("restaurants", restaurant_row(restaurant, Uuid::new_v4(), "Golden Harvest"));

    let response = app
        .post_form(
            &format!("/customer/discover/{restaurant}/feedback"),
            &[("rating", "9")],
        )
        .await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/customer/discover?error=rating");
    assert_eq!(app.platform.write_count("feedback"), 0);

    let page = app.get("/customer/discover?error=rating").await;
    let body = page.text().await.expect("read discover body");
    assert!(body.contains("Choose a rating from 1 to 5."));
}
