//! Auth flow integration tests.
//!
//! Covers the full sign-up / sign-in / sign-out loop against the platform:
//! - Sign-up registers the account, writes the profile, and starts a session
//! - Local validation failures never reach the platform
//! - Platform rejections surface as error codes with the email preserved
//! - A missing profile fails closed instead of granting a session
//!
//! Run with:
//! ```bash
//! cargo test -p plateful-integration-tests --test auth_flow
//! ```

use plateful_integration_tests::{TEST_PASSWORD, TestApp, location, unique_email};
use serde_json::Value;

#[tokio::test]
async fn sign_up_creates_an_account_and_profile() {
    let app = TestApp::spawn().await;
    let email = unique_email("new-customer");

    let response = app.sign_up_customer(&email).await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/customer/home");
    assert_eq!(app.platform.account_count(), 1);

    let profiles = app.platform.rows("profiles");
    let profile = profiles.first().expect("profile row written at sign-up");
    assert_eq!(profile.get("email").and_then(Value::as_str), Some(email.as_str()));
    assert_eq!(profile.get("user_type").and_then(Value::as_str), Some("customer"));
}

#[tokio::test]
async fn duplicate_sign_up_reports_email_taken() {
    let app = TestApp::spawn().await;
    let email = unique_email("repeat");
    app.sign_up_customer(&email).await;
    app.sign_out().await;

    let response = app.sign_up_customer(&email).await;

    assert_eq!(response.status(), 303);
    let target = location(&response);
    assert!(target.contains("error=email_taken"), "unexpected redirect: {target}");
    assert_eq!(app.platform.account_count(), 1);
}

#[tokio::test]
async fn mismatched_passwords_never_reach_the_platform() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/sign-up",
            &[
                ("full_name", "Pat Rivers"),
                ("email", "pat@example.com"),
                ("password", "table-for-two-9"),
                ("password_confirm", "table-for-two-8"),
                ("user_type", "customer"),
            ],
        )
        .await;

    assert_eq!(response.status(), 303);
    let target = location(&response);
    assert!(target.contains("error=password_mismatch"), "unexpected redirect: {target}");
    assert!(target.contains("email=pat%40example.com"), "form email should be preserved: {target}");
    assert_eq!(app.platform.account_count(), 0);
}

#[tokio::test]
async fn wrong_password_reports_bad_credentials() {
    let app = TestApp::spawn().await;
    let email = unique_email("typo");
    app.sign_up_customer(&email).await;
    app.sign_out().await;

    let response = app.sign_in(&email, "not-the-password").await;

    assert_eq!(response.status(), 303);
    let target = location(&response);
    assert!(target.contains("error=credentials"), "unexpected redirect: {target}");

    let response = app.get("/customer/home").await;
    assert_eq!(response.status(), 303, "failed sign-in should leave no session");
}

#[tokio::test]
async fn owner_sign_in_lands_on_the_dashboard() {
    let app = TestApp::spawn().await;
    let email = unique_email("returning-owner");
    app.sign_up_owner(&email).await;
    app.sign_out().await;

    let response = app.sign_in(&email, TEST_PASSWORD).await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn sign_in_without_a_profile_fails_closed() {
    let app = TestApp::spawn().await;
    let email = unique_email("orphan");
    app.sign_up_customer(&email).await;
    app.sign_out().await;

    // The account still exists but its profile row is gone.
    app.platform.clear_table("profiles");

    let response = app.sign_in(&email, TEST_PASSWORD).await;
    assert_eq!(response.status(), 303);
    let target = location(&response);
    assert!(target.contains("error=profile"), "unexpected redirect: {target}");

    let response = app.get("/customer/home").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth?mode=sign-in&type=customer");
}

#[tokio::test]
async fn sign_out_revokes_the_platform_session() {
    let app = TestApp::spawn().await;
    app.sign_up_customer(&unique_email("leaver")).await;

    let response = app.sign_out().await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");
    assert_eq!(app.platform.sign_out_count(), 1);

    let response = app.get("/customer/home").await;
    assert_eq!(response.status(), 303, "signed-out session should not reach guarded pages");
}
