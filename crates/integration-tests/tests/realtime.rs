//! Change feed integration tests.
//!
//! The app holds one subscription to the platform's change feed and maps
//! each committed change to a cache invalidation. These tests push events
//! through a live feed and watch the table counters:
//! - An event for a cached table forces a refetch on the next load
//! - An event only invalidates its own table's cache entries
//!
//! Run with:
//! ```bash
//! cargo test -p plateful-integration-tests --test realtime
//! ```

use std::time::Duration;

use plateful_core::OrderStatus;
use plateful_integration_tests::{
    TestApp, location, order_row, restaurant_row, unique_email, wait_for,
};
use uuid::Uuid;

/// Sign an owner up, give them a restaurant with one pending order, and
/// open the change feed.
async fn owner_with_orders(app: &TestApp) {
    let email = unique_email("host");
    let response = app.sign_up_owner(&email).await;
    assert_eq!(location(&response), "/dashboard");

    let owner_id = app.platform.user_id(&email).expect("owner account");
    let restaurant_id = Uuid::new_v4();
    app.platform.seed(
        "restaurants",
        restaurant_row(restaurant_id, owner_id, "Juniper & Ash"),
    );
    app.platform.seed(
        "orders",
        order_row(Uuid::new_v4(), restaurant_id, Uuid::new_v4(), OrderStatus::Pending),
    );

    app.state.start_realtime_invalidation();
    wait_for("change feed connection", || {
        app.platform.realtime_connections() >= 1
    })
    .await;
}

#[tokio::test]
async fn change_events_refresh_dashboard_orders() {
    let app = TestApp::spawn().await;
    owner_with_orders(&app).await;

    let response = app.get("/dashboard/orders").await;
    assert_eq!(response.status(), 200);
    let warmed = app.platform.read_count("orders");
    assert!(warmed >= 1, "first load should hit the table API");

    let response = app.get("/dashboard/orders").await;
    assert_eq!(response.status(), 200);
    assert_eq!(app.platform.read_count("orders"), warmed, "fresh reads should stay cached");

    app.platform.emit_change("orders", "UPDATE");

    let mut refetched = false;
    for _ in 0..200 {
        let response = app.get("/dashboard/orders").await;
        assert_eq!(response.status(), 200);
        if app.platform.read_count("orders") > warmed {
            refetched = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(refetched, "change event should mark the orders cache stale");
}

#[tokio::test]
async fn change_events_only_invalidate_their_own_table() {
    let app = TestApp::spawn().await;
    owner_with_orders(&app).await;

    let response = app.get("/dashboard/orders").await;
    assert_eq!(response.status(), 200);
    let response = app.get("/dashboard/reservations").await;
    assert_eq!(response.status(), 200);
    let order_reads = app.platform.read_count("orders");
    let reservation_reads = app.platform.read_count("reservations");

    app.platform.emit_change("reservations", "INSERT");

    // Poll the reservations page until its refetch proves the event was
    // received and processed.
    let mut refetched = false;
    for _ in 0..200 {
        let response = app.get("/dashboard/reservations").await;
        assert_eq!(response.status(), 200);
        if app.platform.read_count("reservations") > reservation_reads {
            refetched = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(refetched, "reservation event should refetch reservations");

    let response = app.get("/dashboard/orders").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        app.platform.read_count("orders"),
        order_reads,
        "a reservation event should leave the orders cache alone"
    );
}
