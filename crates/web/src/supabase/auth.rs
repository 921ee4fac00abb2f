//! Auth service client: sign-up, sign-in, sign-out, and user lookup.

use plateful_core::UserId;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use super::{SupabaseClient, SupabaseError, check_status, read_json};

/// Errors surfaced by sign-up and sign-in flows.
///
/// The auth service reports failures as 4xx statuses with a human-readable
/// message; the common ones are classified here so views can render inline
/// messages instead of a generic failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("email address not confirmed yet")]
    EmailNotConfirmed,
    #[error("{0}")]
    WeakPassword(String),
    #[error(transparent)]
    Provider(SupabaseError),
}

impl From<SupabaseError> for AuthError {
    fn from(err: SupabaseError) -> Self {
        if let SupabaseError::Api { status, message } = &err
            && matches!(status, 400 | 401 | 422)
        {
            let lower = message.to_lowercase();
            if lower.contains("already registered") || lower.contains("already exists") {
                return Self::EmailTaken;
            }
            if lower.contains("invalid login credentials") || lower.contains("invalid grant") {
                return Self::InvalidCredentials;
            }
            if lower.contains("not confirmed") {
                return Self::EmailNotConfirmed;
            }
            if lower.contains("password") {
                return Self::WeakPassword(message.clone());
            }
        }
        Self::Provider(err)
    }
}

/// The authenticated user as reported by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An issued session: the access token plus the user it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Result of a sign-up attempt.
///
/// Projects with email confirmation enabled return a bare user and no
/// session; the caller must ask the user to confirm before signing in.
#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired(AuthUser),
}

/// The sign-up endpoint returns either a session envelope or a bare user
/// object depending on project settings.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    email: Option<String>,
}

impl SignUpResponse {
    fn into_outcome(self) -> Result<SignUpOutcome, SupabaseError> {
        if let (Some(access_token), Some(user)) = (self.access_token, self.user) {
            return Ok(SignUpOutcome::SignedIn(AuthSession { access_token, user }));
        }
        if let Some(id) = self.id {
            return Ok(SignUpOutcome::ConfirmationRequired(AuthUser {
                id,
                email: self.email,
            }));
        }
        Err(SupabaseError::Invalid(
            "sign-up response carried neither a session nor a user".to_string(),
        ))
    }
}

/// Client for the platform auth service.
#[derive(Clone)]
pub struct AuthClient {
    client: SupabaseClient,
}

impl AuthClient {
    pub(super) const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Register a new account.
    ///
    /// `metadata` is stored as user metadata on the auth record (the profile
    /// row itself is written separately).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` / `AuthError::WeakPassword` for the
    /// classified rejections, `AuthError::Provider` otherwise.
    #[instrument(skip(self, password, metadata), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<SignUpOutcome, AuthError> {
        let url = self.client.endpoint("auth/v1/signup")?;
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.api_key())
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(SupabaseError::Http)?;

        let parsed: SignUpResponse = read_json(response, "auth sign-up").await?;
        Ok(parsed.into_outcome()?)
    }

    /// Exchange email + password for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the platform rejects the
    /// pair, `AuthError::EmailNotConfirmed` for unconfirmed accounts.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let mut url = self.client.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.api_key())
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(SupabaseError::Http)?;

        Ok(read_json(response, "auth sign-in").await?)
    }

    /// Revoke the given access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the revocation; callers
    /// treat this as best effort and clear the session regardless.
    #[instrument(skip(self, access_token))]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let url = self.client.endpoint("auth/v1/logout")?;
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.api_key())
            .bearer_auth(access_token)
            .send()
            .await?;

        check_status(response, "auth sign-out").await
    }

    /// Look up the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` with status 401 for invalid or expired
    /// tokens.
    #[instrument(skip(self, access_token))]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, SupabaseError> {
        let url = self.client.endpoint("auth/v1/user")?;
        let response = self
            .client
            .http()
            .get(url)
            .header("apikey", self.client.api_key())
            .bearer_auth(access_token)
            .send()
            .await?;

        read_json(response, "auth user lookup").await
    }

    /// Auth service health probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<(), SupabaseError> {
        let url = self.client.endpoint("auth/v1/health")?;
        let response = self
            .client
            .http()
            .get(url)
            .header("apikey", self.client.api_key())
            .send()
            .await?;

        check_status(response, "auth health").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api_error(status: u16, message: &str) -> SupabaseError {
        SupabaseError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn classifies_email_taken() {
        let err = AuthError::from(api_error(400, "User already registered"));
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[test]
    fn classifies_invalid_credentials() {
        let err = AuthError::from(api_error(400, "Invalid login credentials"));
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn classifies_unconfirmed_email() {
        let err = AuthError::from(api_error(401, "Email not confirmed"));
        assert!(matches!(err, AuthError::EmailNotConfirmed));
    }

    #[test]
    fn classifies_weak_password() {
        let err = AuthError::from(api_error(422, "Password should be at least 6 characters"));
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[test]
    fn server_errors_pass_through() {
        let err = AuthError::from(api_error(500, "internal"));
        assert!(matches!(err, AuthError::Provider(_)));
    }

    #[test]
    fn sign_up_response_with_session() {
        let parsed: SignUpResponse = serde_json::from_value(serde_json::json!({
            "access_token": "token-123",
            "token_type": "bearer",
            "user": { "id": "1f7a2f6a-5f31-4bb2-a211-2f1d1ba3c001", "email": "a@b.com" },
        }))
        .unwrap();
        let outcome = parsed.into_outcome().unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
    }

    #[test]
    fn sign_up_response_confirmation_required() {
        let parsed: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": "1f7a2f6a-5f31-4bb2-a211-2f1d1ba3c001",
            "email": "a@b.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        let outcome = parsed.into_outcome().unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired(_)));
    }

    #[test]
    fn sign_up_response_malformed() {
        let parsed: SignUpResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parsed.into_outcome().is_err());
    }
}
