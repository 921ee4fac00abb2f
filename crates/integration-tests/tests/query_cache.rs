//! Query cache integration tests.
//!
//! Observes cache behavior from outside the app through the platform's
//! per-table request counters:
//! - Concurrent page loads of the same data share one platform fetch
//! - Repeat loads inside the fresh window never refetch
//! - Search terms are cached as their own keys
//! - A rejected mutation leaves the cache and counters untouched
//! - A successful mutation invalidates, and the page picks up the write
//!
//! Run with:
//! ```bash
//! cargo test -p plateful-integration-tests --test query_cache
//! ```

use std::time::Duration;

use plateful_integration_tests::{TestApp, location, post_row, unique_email};
use uuid::Uuid;

#[tokio::test]
async fn concurrent_page_loads_share_one_fetch() {
    let app = TestApp::spawn().await;
    app.sign_up_customer(&unique_email("slow-reader")).await;
    app.platform.seed(
        "restaurants",
        plateful_integration_tests::restaurant_row(Uuid::new_v4(), Uuid::new_v4(), "Golden Harvest"),
    );

    // Warm the identity cache so the concurrent loads below are pure reads.
    let response = app.get("/customer/home").await;
    assert_eq!(response.status(), 200);

    app.platform.set_read_delay(Duration::from_millis(150));
    let (a, b, c, d) = tokio::join!(
        app.get("/customer/discover"),
        app.get("/customer/discover"),
        app.get("/customer/discover"),
        app.get("/customer/discover"),
    );

    for response in [a, b, c, d] {
        assert_eq!(response.status(), 200);
        let body = response.text().await.expect("read discover body");
        assert!(body.contains("Golden Harvest"));
    }
    assert_eq!(
        app.platform.read_count("restaurants"),
        1,
        "overlapping loads should share one platform fetch"
    );
}

#[tokio::test]
async fn repeat_loads_inside_the_fresh_window_never_refetch() {
    let app = TestApp::spawn().await;
    app.sign_up_customer(&unique_email("regular")).await;
    app.platform.seed(
        "restaurants",
        plateful_integration_tests::restaurant_row(Uuid::new_v4(), Uuid::new_v4(), "Golden Harvest"),
    );

    let response = app.get("/customer/discover").await;
    assert_eq!(response.status(), 200);
    let warmed = app.platform.read_count("restaurants");

    for _ in 0..3 {
        let response = app.get("/customer/discover").await;
        assert_eq!(response.status(), 200);
    }

    assert_eq!(app.platform.read_count("restaurants"), warmed);
}

#[tokio::test]
async fn search_results_are_cached_per_term() {
    let app = TestApp::spawn().await;
    app.sign_up_customer(&unique_email("searcher")).await;
    app.platform.seed(
        "restaurants",
        plateful_integration_tests::restaurant_row(Uuid::new_v4(), Uuid::new_v4(), "Pizza Barn"),
    );
    app.platform.seed(
        "restaurants",
        plateful_integration_tests::restaurant_row(Uuid::new_v4(), Uuid::new_v4(), "Noodle Yard"),
    );

    let response = app.get("/customer/discover").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("read browse body");
    assert!(body.contains("Pizza Barn"));
    assert!(body.contains("Noodle Yard"));

    let response = app.get("/customer/discover?q=pizza").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("read search body");
    assert!(body.contains("Pizza Barn"));
    assert!(!body.contains("Noodle Yard"));

    assert_eq!(
        app.platform.read_count("restaurants"),
        2,
        "browse and search should be separate cache keys"
    );
}

#[tokio::test]
async fn rejected_comment_leaves_the_cache_untouched() {
    let app = TestApp::spawn().await;
    let post_id = Uuid::new_v4();
    app.platform
        .seed("posts", post_row(post_id, Uuid::new_v4(), "Corner booth review"));
    app.sign_up_customer(&unique_email("lurker")).await;

    let response = app.get(&format!("/customer/posts/{post_id}")).await;
    assert_eq!(response.status(), 200);
    let post_reads = app.platform.read_count("posts");
    let comment_reads = app.platform.read_count("comments");

    let response = app
        .post_form(
            &format!("/customer/posts/{post_id}/comments"),
            &[("content", "   "), ("tab", "for-you")],
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("read re-rendered page");
    assert!(body.contains("Comment cannot be empty"));
    assert!(body.contains("Corner booth review"), "form page should keep its content");

    assert_eq!(app.platform.write_count("comments"), 0);
    assert_eq!(app.platform.read_count("posts"), post_reads);
    assert_eq!(app.platform.read_count("comments"), comment_reads);
}

#[tokio::test]
async fn posted_comment_shows_up_after_invalidation() {
    let app = TestApp::spawn().await;
    let post_id = Uuid::new_v4();
    app.platform
        .seed("posts", post_row(post_id, Uuid::new_v4(), "Corner booth review"));
    app.sign_up_customer(&unique_email("commenter")).await;

    let detail_path = format!("/customer/posts/{post_id}?tab=for-you");
    let response = app.get(&detail_path).await;
    assert_eq!(response.status(), 200);

    let response = app
        .post_form(
            &format!("/customer/posts/{post_id}/comments"),
            &[("content", "Ask for the corner booth"), ("tab", "for-you")],
        )
        .await;

    assert_eq!(response.status(), 303);
    let target = location(&response);
    assert!(
        target.starts_with(&format!("/customer/posts/{post_id}")),
        "unexpected redirect: {target}"
    );
    assert_eq!(app.platform.write_count("comments"), 1);

    // Invalidation marks the key stale; a stale read serves the old rows
    // and refreshes in the background, so poll until the refresh lands.
    let mut body = String::new();
    for _ in 0..200 {
        let response = app.get(&detail_path).await;
        assert_eq!(response.status(), 200);
        body = response.text().await.expect("read detail body");
        if body.contains("Ask for the corner booth") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert!(
        body.contains("Ask for the corner booth"),
        "comment never appeared after invalidation"
    );
    assert!(
        app.platform.read_count("comments") >= 2,
        "invalidation should force a comment refetch"
    );
}
