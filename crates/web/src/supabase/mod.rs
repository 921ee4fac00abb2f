//! Hosted data platform clients (auth, table API, realtime feed, functions).
//!
//! # Architecture
//!
//! - The platform is the source of truth - no local database, direct API calls
//! - One `SupabaseClient` per key (anonymous or service-role); cheap to clone
//! - Sub-clients per surface: `AuthClient`, table queries via
//!   [`SupabaseClient::table`], `RealtimeClient`, `FunctionsClient`
//! - Caching happens in the query cache layer, not here
//!
//! # Example
//!
//! ```rust,ignore
//! use plateful_web::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::with_service_role(&config.supabase);
//!
//! let restaurants: Vec<Restaurant> = client
//!     .table("restaurants")
//!     .select("*")
//!     .ilike("name", "pizza")
//!     .limit(20)
//!     .fetch()
//!     .await?;
//! ```

pub mod auth;
pub mod functions;
pub mod realtime;
pub mod records;
pub mod table;

pub use auth::{AuthClient, AuthError, AuthSession, AuthUser, SignUpOutcome};
pub use functions::FunctionsClient;
pub use realtime::{ChangeEvent, ChangeKind, ChangeStream, RealtimeClient};
pub use table::TableQuery;

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;

/// Errors that can occur when talking to the platform APIs.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform returned a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A response was well-formed JSON but not the expected shape, or a
    /// query was refused before being sent.
    #[error("Invalid: {0}")]
    Invalid(String),
}

impl SupabaseError {
    /// Whether this error is the platform rejecting the caller's token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// Client for the hosted data platform.
///
/// Holds the HTTP client, project URL, and one API key. Clone freely; all
/// clones share the same connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl SupabaseClient {
    /// Create a client using the anonymous key (auth flows, realtime feed).
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_key(config.url.clone(), config.anon_key.clone())
    }

    /// Create a client using the service-role key (server-side table access).
    #[must_use]
    pub fn with_service_role(config: &SupabaseConfig) -> Self {
        Self::with_key(
            config.url.clone(),
            config.service_role_key.expose_secret().to_string(),
        )
    }

    fn with_key(base_url: Url, api_key: String) -> Self {
        Self {
            inner: Arc::new(SupabaseClientInner {
                client: reqwest::Client::new(),
                base_url,
                api_key,
            }),
        }
    }

    /// Auth service sub-client.
    #[must_use]
    pub fn auth(&self) -> AuthClient {
        AuthClient::new(self.clone())
    }

    /// Start a query against one table.
    #[must_use]
    pub fn table(&self, name: &str) -> TableQuery {
        TableQuery::new(self.clone(), name)
    }

    /// Realtime change feed sub-client.
    #[must_use]
    pub fn realtime(&self) -> RealtimeClient {
        RealtimeClient::new(self.clone())
    }

    /// Edge functions sub-client.
    #[must_use]
    pub fn functions(&self) -> FunctionsClient {
        FunctionsClient::new(self.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn api_key(&self) -> &str {
        &self.inner.api_key
    }
}

/// Read a response body as text first, then parse, so parse failures can be
/// logged with the offending payload.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &'static str,
) -> Result<T, SupabaseError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            context,
            body = %text.chars().take(500).collect::<String>(),
            "platform API returned non-success status"
        );
        return Err(SupabaseError::Api {
            status: status.as_u16(),
            message: extract_message(&text),
        });
    }

    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::error!(
                error = %e,
                context,
                body = %text.chars().take(500).collect::<String>(),
                "failed to parse platform response"
            );
            Err(SupabaseError::Parse(e))
        }
    }
}

/// Check a response status and discard the body (write paths that request
/// no representation back).
async fn check_status(response: reqwest::Response, context: &'static str) -> Result<(), SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let text = response.text().await?;
    tracing::error!(
        status = %status,
        context,
        body = %text.chars().take(500).collect::<String>(),
        "platform API returned non-success status"
    );
    Err(SupabaseError::Api {
        status: status.as_u16(),
        message: extract_message(&text),
    })
}

/// Pull a human-readable message out of a platform error body.
///
/// The auth service uses `msg`/`error_description`, the table API uses
/// `message`; fall back to the raw body, truncated.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| {
                    value
                        .get(key)
                        .and_then(serde_json::Value::as_str)
                        .map(String::from)
                })
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_supabase_error_display() {
        let err = SupabaseError::NotFound("restaurants row".to_string());
        assert_eq!(err.to_string(), "Not found: restaurants row");

        let err = SupabaseError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 500): boom");
    }

    #[test]
    fn test_is_unauthorized() {
        let err = SupabaseError::Api {
            status: 401,
            message: "invalid token".to_string(),
        };
        assert!(err.is_unauthorized());

        let err = SupabaseError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_extract_message_table_api() {
        let body = r#"{"code":"PGRST116","message":"duplicate key value"}"#;
        assert_eq!(extract_message(body), "duplicate key value");
    }

    #[test]
    fn test_extract_message_auth_service() {
        let body = r#"{"code":400,"msg":"User already registered"}"#;
        assert_eq!(extract_message(body), "User already registered");
    }

    #[test]
    fn test_extract_message_falls_back_to_body() {
        assert_eq!(extract_message("plain text error"), "plain text error");
    }
}
