//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::CacheError;
use crate::services::mutations::MutationError;
use crate::supabase::{AuthError, SupabaseError};

/// Application-level error type for the web app.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend platform call failed.
    #[error("Platform error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Cached read failed.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Write flow failed.
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry
        if matches!(
            self,
            Self::Supabase(_)
                | Self::Cache(_)
                | Self::Session(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Provider(_))
                | Self::Mutation(MutationError::Write(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Session(_) | Self::Internal(_) | Self::Cache(CacheError::Shape { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Supabase(SupabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Supabase(err) if err.is_unauthorized() => StatusCode::FORBIDDEN,
            Self::Supabase(_) | Self::Cache(CacheError::Fetch { .. }) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::EmailNotConfirmed => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Mutation(err) => match err {
                MutationError::Invalid(_) => StatusCode::BAD_REQUEST,
                MutationError::Write(_) => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Session(_) | Self::Internal(_) | Self::Cache(CacheError::Shape { .. }) => {
                "Internal server error".to_string()
            }
            Self::Supabase(SupabaseError::NotFound(what)) => format!("Not found: {what}"),
            Self::Supabase(err) if err.is_unauthorized() => {
                "You don't have access to this resource".to_string()
            }
            Self::Supabase(_) | Self::Cache(CacheError::Fetch { .. }) => {
                "External service error".to_string()
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::EmailTaken => {
                    "An account with this email already exists".to_string()
                }
                AuthError::EmailNotConfirmed => {
                    "Confirm your email address before signing in".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::Provider(_) => "External service error".to_string(),
            },
            Self::Mutation(err) => match err {
                MutationError::Invalid(msg) => msg.clone(),
                MutationError::Write(_) => "External service error".to_string(),
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("mutation", "Created menu item", Some(&[("restaurant_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("post 123".to_string());
        assert_eq!(err.to_string(), "Not found: post 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::EmailTaken)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_backend_failures_map_to_bad_gateway() {
        let err = AppError::Supabase(SupabaseError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let err = AppError::Cache(CacheError::Fetch {
            key: "channels".to_string(),
            attempts: 2,
            message: "boom".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_row_level_denials_map_to_forbidden() {
        let err = AppError::Supabase(SupabaseError::Api {
            status: 403,
            message: "permission denied".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_missing_rows_map_to_not_found() {
        let err = AppError::Supabase(SupabaseError::NotFound("profiles row".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
