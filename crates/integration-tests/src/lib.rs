//! Integration test harness for Plateful.
//!
//! Tests boot the real router in-process against [`TestPlatform`], an
//! in-memory stand-in for the hosted data platform, so the whole suite
//! runs hermetically:
//!
//! ```bash
//! cargo test -p plateful-integration-tests
//! ```
//!
//! The platform mock serves the four surfaces the app touches (auth
//! service, table API, realtime change feed, edge functions) from an
//! in-memory table store and counts requests per table. The counters are
//! what make cache behavior observable from the outside: a page served
//! from cache leaves the read counter where it was.
//!
//! [`TestApp`] owns one app instance, one platform, and a cookie-holding
//! HTTP client, plus form helpers for the auth flows most scenarios need.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Harness code: helpers panic on wiring failures instead of returning
// errors, and the mock route handlers must be async to satisfy axum.
#![allow(clippy::missing_panics_doc, clippy::unused_async)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::stream::unfold;
use parking_lot::Mutex;
use plateful_core::{OrderStatus, Role};
use plateful_web::config::{AppConfig, CacheConfig, SupabaseConfig};
use plateful_web::routes;
use plateful_web::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

/// Password the sign-up helpers register accounts with.
pub const TEST_PASSWORD: &str = "table-for-two-9";

/// Timestamp stamped onto seeded and inserted rows.
pub const SEED_CREATED_AT: &str = "2024-06-01T12:00:00Z";

const TEST_SESSION_SECRET: &str = "0f7d1a6b44c2e95388a1d07c52b9ee3864f0c1db27a5e49b";

// =============================================================================
// Mock Platform
// =============================================================================

#[derive(Clone)]
struct Account {
    id: Uuid,
    password: String,
}

#[derive(Clone)]
struct TokenEntry {
    user_id: Uuid,
    email: String,
}

struct PlatformState {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    accounts: Mutex<HashMap<String, Account>>,
    tokens: Mutex<HashMap<String, TokenEntry>>,
    reads: Mutex<HashMap<String, usize>>,
    writes: Mutex<HashMap<String, usize>>,
    sign_outs: Mutex<usize>,
    realtime_connections: Mutex<usize>,
    read_delay: Mutex<Option<Duration>>,
    changes: broadcast::Sender<String>,
    payment_client_id: Mutex<Option<String>>,
}

impl PlatformState {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            tables: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            reads: Mutex::new(HashMap::new()),
            writes: Mutex::new(HashMap::new()),
            sign_outs: Mutex::new(0),
            realtime_connections: Mutex::new(0),
            read_delay: Mutex::new(None),
            changes,
            payment_client_id: Mutex::new(None),
        }
    }
}

/// An in-memory stand-in for the hosted data platform.
///
/// Serves the auth service, the table API, the realtime change feed, and
/// the `payment-config` edge function on an ephemeral local port. Rows
/// are plain JSON objects; reads apply the `eq`, `ilike`, and `in`
/// filters the app sends and ignore `select`/`order`, so seeds carry
/// their relationship embeds pre-baked.
pub struct TestPlatform {
    state: Arc<PlatformState>,
    url: Url,
}

impl TestPlatform {
    /// Bind the mock platform on an ephemeral port and start serving it.
    pub async fn spawn() -> Self {
        let state = Arc::new(PlatformState::new());
        let router = platform_router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind mock platform listener");
        let addr = listener.local_addr().expect("read mock platform address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let url = format!("http://{addr}/").parse().expect("mock platform URL");
        Self { state, url }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Insert a row directly into the backing store.
    pub fn seed(&self, table: &str, row: Value) {
        self.state
            .tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Remove every row from one table.
    pub fn clear_table(&self, table: &str) {
        self.state.tables.lock().remove(table);
    }

    /// Current contents of one table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .tables
            .lock()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// How many read requests one table has served.
    #[must_use]
    pub fn read_count(&self, table: &str) -> usize {
        self.state.reads.lock().get(table).copied().unwrap_or(0)
    }

    /// How many insert/update/delete requests one table has served.
    #[must_use]
    pub fn write_count(&self, table: &str) -> usize {
        self.state.writes.lock().get(table).copied().unwrap_or(0)
    }

    /// Write requests summed across every table.
    #[must_use]
    pub fn total_write_count(&self) -> usize {
        self.state.writes.lock().values().sum()
    }

    #[must_use]
    pub fn sign_out_count(&self) -> usize {
        *self.state.sign_outs.lock()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.state.accounts.lock().len()
    }

    /// The auth id assigned to an account at sign-up.
    #[must_use]
    pub fn user_id(&self, email: &str) -> Option<Uuid> {
        self.state
            .accounts
            .lock()
            .get(email)
            .map(|account| account.id)
    }

    /// Delay every table read; makes request coalescing observable.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.state.read_delay.lock() = Some(delay);
    }

    /// Configure the client id the `payment-config` function hands out.
    pub fn set_payment_client_id(&self, client_id: &str) {
        *self.state.payment_client_id.lock() = Some(client_id.to_string());
    }

    /// How many change feed subscriptions have been opened.
    #[must_use]
    pub fn realtime_connections(&self) -> usize {
        *self.state.realtime_connections.lock()
    }

    /// Push one change record to every open change feed.
    pub fn emit_change(&self, table: &str, kind: &str) {
        let line = format!("{}\n", json!({ "table": table, "type": kind }));
        let _ = self.state.changes.send(line);
    }
}

// =============================================================================
// Platform Routes
// =============================================================================

fn platform_router(platform: Arc<PlatformState>) -> Router {
    Router::new()
        .route("/auth/v1/signup", post(auth_signup))
        .route("/auth/v1/token", post(auth_token))
        .route("/auth/v1/logout", post(auth_logout))
        .route("/auth/v1/user", get(auth_user))
        .route("/auth/v1/health", get(auth_health))
        .route(
            "/rest/v1/{table}",
            get(rest_select)
                .post(rest_insert)
                .patch(rest_update)
                .delete(rest_delete),
        )
        .route("/realtime/v1/changes", get(realtime_changes))
        .route("/functions/v1/payment-config", post(payment_config))
        .with_state(platform)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "msg": message }))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn issue_token(platform: &PlatformState, user_id: Uuid, email: &str) -> String {
    let token = format!("token-{}", Uuid::new_v4());
    platform.tokens.lock().insert(
        token.clone(),
        TokenEntry {
            user_id,
            email: email.to_string(),
        },
    );
    token
}

fn bump(counts: &Mutex<HashMap<String, usize>>, table: &str) {
    *counts.lock().entry(table.to_string()).or_insert(0) += 1;
}

async fn auth_signup(
    State(platform): State<Arc<PlatformState>>,
    Json(body): Json<Value>,
) -> Response {
    let Some(email) = body.get("email").and_then(Value::as_str).map(str::to_string) else {
        return error_response(StatusCode::BAD_REQUEST, "Signup requires an email");
    };
    let Some(password) = body
        .get("password")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return error_response(StatusCode::BAD_REQUEST, "Signup requires a password");
    };

    let user_id = Uuid::new_v4();
    {
        let mut accounts = platform.accounts.lock();
        if accounts.contains_key(&email) {
            return error_response(StatusCode::BAD_REQUEST, "User already registered");
        }
        accounts.insert(
            email.clone(),
            Account {
                id: user_id,
                password,
            },
        );
    }

    // The platform writes the profile row from the sign-up metadata.
    let metadata = body.get("data").cloned().unwrap_or_else(|| json!({}));
    platform
        .tables
        .lock()
        .entry("profiles".to_string())
        .or_default()
        .push(json!({
            "id": user_id,
            "email": email,
            "full_name": metadata.get("full_name").cloned().unwrap_or(Value::Null),
            "user_type": metadata.get("user_type").cloned().unwrap_or(Value::Null),
            "created_at": SEED_CREATED_AT,
        }));

    let token = issue_token(&platform, user_id, &email);
    Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "user": { "id": user_id, "email": email },
    }))
    .into_response()
}

async fn auth_token(
    State(platform): State<Arc<PlatformState>>,
    Json(body): Json<Value>,
) -> Response {
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let account = platform.accounts.lock().get(&email).cloned();
    match account {
        Some(account) if account.password == password => {
            let token = issue_token(&platform, account.id, &email);
            Json(json!({
                "access_token": token,
                "token_type": "bearer",
                "user": { "id": account.id, "email": email },
            }))
            .into_response()
        }
        _ => error_response(StatusCode::BAD_REQUEST, "Invalid login credentials"),
    }
}

async fn auth_logout(State(platform): State<Arc<PlatformState>>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        platform.tokens.lock().remove(&token);
    }
    *platform.sign_outs.lock() += 1;
    StatusCode::NO_CONTENT
}

async fn auth_user(State(platform): State<Arc<PlatformState>>, headers: HeaderMap) -> Response {
    let entry =
        bearer_token(&headers).and_then(|token| platform.tokens.lock().get(&token).cloned());
    match entry {
        Some(entry) => Json(json!({ "id": entry.user_id, "email": entry.email })).into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "invalid token"),
    }
}

async fn auth_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn rest_select(
    State(platform): State<Arc<PlatformState>>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    bump(&platform.reads, &table);
    let delay = *platform.read_delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let rows = platform
        .tables
        .lock()
        .get(&table)
        .cloned()
        .unwrap_or_default();
    let mut rows: Vec<Value> = rows
        .into_iter()
        .filter(|row| row_matches(row, &params))
        .collect();
    if let Some(limit) = params.get("limit").and_then(|raw| raw.parse::<usize>().ok()) {
        rows.truncate(limit);
    }
    Json(Value::Array(rows))
}

async fn rest_insert(
    State(platform): State<Arc<PlatformState>>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    bump(&platform.writes, &table);

    let mut row = body;
    if let Some(fields) = row.as_object_mut() {
        fields.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
        fields
            .entry("created_at")
            .or_insert_with(|| json!(SEED_CREATED_AT));
    }
    platform
        .tables
        .lock()
        .entry(table)
        .or_default()
        .push(row.clone());

    let wants_rows = headers
        .get("prefer")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|prefer| prefer.contains("return=representation"));
    if wants_rows {
        (StatusCode::CREATED, Json(json!([row]))).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn rest_update(
    State(platform): State<Arc<PlatformState>>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    bump(&platform.writes, &table);
    let Some(patch) = body.as_object() else {
        return StatusCode::BAD_REQUEST;
    };

    let mut tables = platform.tables.lock();
    if let Some(rows) = tables.get_mut(&table) {
        for row in rows.iter_mut() {
            if !row_matches(row, &params) {
                continue;
            }
            if let Some(fields) = row.as_object_mut() {
                for (key, value) in patch {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
    StatusCode::NO_CONTENT
}

async fn rest_delete(
    State(platform): State<Arc<PlatformState>>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    bump(&platform.writes, &table);
    let mut tables = platform.tables.lock();
    if let Some(rows) = tables.get_mut(&table) {
        rows.retain(|row| !row_matches(row, &params));
    }
    StatusCode::NO_CONTENT
}

async fn realtime_changes(State(platform): State<Arc<PlatformState>>) -> Response {
    *platform.realtime_connections.lock() += 1;
    let receiver = platform.changes.subscribe();
    let lines = unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(line) => return Some((Ok::<_, std::convert::Infallible>(line), receiver)),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Body::from_stream(lines).into_response()
}

async fn payment_config(State(platform): State<Arc<PlatformState>>) -> Json<Value> {
    Json(json!({ "clientId": platform.payment_client_id.lock().clone() }))
}

fn row_matches(row: &Value, params: &HashMap<String, String>) -> bool {
    params.iter().all(|(column, predicate)| {
        if matches!(column.as_str(), "select" | "order" | "limit") {
            return true;
        }
        predicate_matches(row.get(column.as_str()), predicate)
    })
}

/// The operators the app actually sends: `eq`, `ilike`, and `in`.
fn predicate_matches(field: Option<&Value>, predicate: &str) -> bool {
    if let Some(expected) = predicate.strip_prefix("eq.") {
        return field.is_some_and(|value| field_text(value) == expected);
    }
    if let Some(needle) = predicate.strip_prefix("ilike.") {
        let needle = needle.trim_matches('*').to_lowercase();
        return field
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle));
    }
    if let Some(inner) = predicate
        .strip_prefix("in.(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        // An empty list matches no rows.
        if inner.is_empty() {
            return false;
        }
        return field.is_some_and(|value| {
            inner
                .split(',')
                .any(|allowed| field_text(value) == allowed)
        });
    }
    true
}

fn field_text(field: &Value) -> String {
    match field {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// App Harness
// =============================================================================

/// One app instance wired to one mock platform.
pub struct TestApp {
    base_url: String,
    pub client: reqwest::Client,
    pub platform: TestPlatform,
    pub state: AppState,
}

impl TestApp {
    /// Boot a fresh app against its own mock platform.
    pub async fn spawn() -> Self {
        Self::with_platform(TestPlatform::spawn().await).await
    }

    /// Boot the app against an existing platform (for pre-seeded stores).
    pub async fn with_platform(platform: TestPlatform) -> Self {
        let state = AppState::new(test_config(platform.url().clone()));
        let router = routes::app(state.clone());
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind app listener");
        let addr = listener.local_addr().expect("read app address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        // Redirects are assertions in these tests, so the client never
        // follows them on its own.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build test HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            platform,
            state,
        }
    }

    /// Absolute URL for an app path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Register an account through the real sign-up form.
    pub async fn sign_up(
        &self,
        email: &str,
        name: &str,
        role: Role,
        password: &str,
    ) -> reqwest::Response {
        self.post_form(
            "/auth/sign-up",
            &[
                ("full_name", name),
                ("email", email),
                ("password", password),
                ("password_confirm", password),
                ("user_type", role.as_str()),
            ],
        )
        .await
    }

    pub async fn sign_up_customer(&self, email: &str) -> reqwest::Response {
        self.sign_up(email, "Casey Diner", Role::Customer, TEST_PASSWORD)
            .await
    }

    pub async fn sign_up_owner(&self, email: &str) -> reqwest::Response {
        self.sign_up(email, "Morgan Host", Role::RestaurantOwner, TEST_PASSWORD)
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form("/auth/sign-in", &[("email", email), ("password", password)])
            .await
    }

    pub async fn sign_out(&self) -> reqwest::Response {
        self.post_form("/auth/sign-out", &[]).await
    }
}

fn test_config(platform_url: Url) -> AppConfig {
    AppConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        supabase: SupabaseConfig {
            url: platform_url,
            anon_key: "test-anon-key".to_string(),
            service_role_key: SecretString::from("test-service-role-key"),
        },
        cache: CacheConfig {
            stale_after: Duration::from_secs(300),
            retry_limit: 1,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Seed Rows
// =============================================================================

/// A `restaurants` row in the shape the table API returns.
#[must_use]
pub fn restaurant_row(id: Uuid, owner_id: Uuid, name: &str) -> Value {
    json!({
        "id": id,
        "owner_id": owner_id,
        "name": name,
        "description": "Seasonal small plates and a long counter.",
        "cuisine_type": "Fusion",
        "address": "12 Market Lane",
        "phone": "555-0134",
        "email": null,
        "created_at": SEED_CREATED_AT,
    })
}

/// A `posts` row with author and count embeds pre-baked.
#[must_use]
pub fn post_row(id: Uuid, user_id: Uuid, content: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "content": content,
        "image_url": null,
        "type": "social",
        "created_at": SEED_CREATED_AT,
        "profiles": { "full_name": "Robin Field", "avatar_url": null },
        "likes": [{ "count": 0 }],
        "comments": [{ "count": 0 }],
    })
}

/// An `orders` row with one line item embed.
#[must_use]
pub fn order_row(id: Uuid, restaurant_id: Uuid, customer_id: Uuid, status: OrderStatus) -> Value {
    json!({
        "id": id,
        "customer_id": customer_id,
        "restaurant_id": restaurant_id,
        "status": status.as_str(),
        "total_amount": "24.00",
        "notes": null,
        "created_at": SEED_CREATED_AT,
        "order_items": [{
            "id": Uuid::new_v4(),
            "menu_item_id": Uuid::new_v4(),
            "quantity": 2,
            "unit_price": "12.00",
            "notes": null,
            "menu_items": { "name": "Smoked tomato soup" },
        }],
    })
}

// =============================================================================
// Assertion Helpers
// =============================================================================

/// The `Location` header of a redirect response, or `""`.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// A unique mailbox per call, so parallel tests never collide.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4())
}

/// Poll `check` every 25ms until it passes.
///
/// # Panics
///
/// Panics if `check` still fails after five seconds.
pub async fn wait_for(description: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {description}");
}
