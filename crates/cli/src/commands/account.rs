//! Platform account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a restaurant owner account
//! plateful account create -e owner@example.com -n "Owner Name" -r restaurant_owner -p <password>
//!
//! # Create a customer account (the default role)
//! plateful account create -e diner@example.com -n "Diner Name" -p <password>
//!
//! # Turn an existing customer into a restaurant owner
//! plateful account promote -e diner@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Base URL of the hosted data platform project
//! - `SUPABASE_ANON_KEY` - Platform anonymous API key
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service-role key (`promote` only)

use plateful_core::{Email, Role, UserId};
use thiserror::Error;
use tracing::info;

use plateful_web::config::{AppConfig, ConfigError};
use plateful_web::supabase::records::Profile;
use plateful_web::supabase::{AuthError, SignUpOutcome, SupabaseClient, SupabaseError};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: customer, restaurant_owner")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Display name is empty.
    #[error("Display name must not be empty")]
    MissingName,

    /// Password below the platform minimum.
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    /// No profile row matches the email.
    #[error("no account found for {0}")]
    UnknownEmail(String),

    /// Configuration failed to load.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The platform rejected the sign-up.
    #[error("sign-up failed: {0}")]
    Auth(#[from] AuthError),

    /// A platform read or write failed.
    #[error("platform error: {0}")]
    Platform(#[from] SupabaseError),
}

/// Create a new platform account.
///
/// The role is stored as user metadata; the platform creates the profile
/// row from it, the same way the web sign-up form does.
///
/// # Arguments
///
/// * `email` - Account email address
/// * `name` - Display name
/// * `role` - Account role (`customer` or `restaurant_owner`)
/// * `password` - Initial password (min 8 characters)
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `AccountError` if validation fails, configuration cannot be
/// loaded, or the platform rejects the sign-up (for example, the email
/// is already registered).
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<UserId, AccountError> {
    // Parse and validate role
    let role: Role = role
        .parse()
        .map_err(|_| AccountError::InvalidRole(role.to_owned()))?;

    let email = Email::parse(email).map_err(|_| AccountError::InvalidEmail(email.to_owned()))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(AccountError::MissingName);
    }
    if password.len() < 8 {
        return Err(AccountError::PasswordTooShort);
    }

    let config = AppConfig::from_env()?;
    let client = SupabaseClient::new(&config.supabase);

    info!("Creating account: {} ({})", email, role);

    let metadata = serde_json::json!({
        "full_name": name,
        "user_type": role.as_str(),
    });

    let outcome = client
        .auth()
        .sign_up(email.as_str(), password, &metadata)
        .await?;

    let user_id = match outcome {
        SignUpOutcome::SignedIn(issued) => {
            info!(
                "Account created successfully! ID: {}, Email: {}, Role: {}",
                issued.user.id, email, role
            );
            issued.user.id
        }
        SignUpOutcome::ConfirmationRequired(user) => {
            info!(
                "Account created, confirmation pending. ID: {}, Email: {}, Role: {}",
                user.id, email, role
            );
            info!("A confirmation email has been sent; the account activates once it is opened.");
            user.id
        }
    };

    Ok(user_id)
}

/// Promote an existing account to restaurant owner.
///
/// Rewrites the profile's `user_type`; the dashboard route guard reads
/// the change on the user's next sign-in. Runs under the service-role
/// key, so it works on any account.
///
/// # Errors
///
/// Returns `AccountError` if the email is malformed, no profile matches
/// it, configuration cannot be loaded, or the update fails.
pub async fn promote(email: &str) -> Result<(), AccountError> {
    let email = Email::parse(email).map_err(|_| AccountError::InvalidEmail(email.to_owned()))?;

    let config = AppConfig::from_env()?;
    let client = SupabaseClient::with_service_role(&config.supabase);

    let profile: Option<Profile> = client
        .table("profiles")
        .select("*")
        .eq("email", email.as_str())
        .fetch_optional()
        .await?;
    let Some(profile) = profile else {
        return Err(AccountError::UnknownEmail(email.as_str().to_owned()));
    };

    if profile.user_type == Some(Role::RestaurantOwner) {
        info!("{email} is already a restaurant owner");
        return Ok(());
    }

    client
        .table("profiles")
        .eq("id", profile.id)
        .update(&serde_json::json!({ "user_type": Role::RestaurantOwner.as_str() }))
        .await?;

    info!("Promoted {email} to restaurant owner (ID: {})", profile.id);
    Ok(())
}
