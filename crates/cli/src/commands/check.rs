//! Configuration and platform health checks.
//!
//! # Usage
//!
//! ```bash
//! # Load the environment and print a redacted summary
//! plateful check config
//!
//! # Probe the hosted data platform's auth service
//! plateful check platform
//! ```
//!
//! # Environment Variables
//!
//! Reads the same variables as the web server; see `plateful-web`'s
//! configuration module for the full list.

use thiserror::Error;
use tracing::info;

use plateful_web::config::{AppConfig, ConfigError};
use plateful_web::supabase::{SupabaseClient, SupabaseError};

/// Errors that can occur while running checks.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The platform rejected or failed the health probe.
    #[error("platform health check failed: {0}")]
    Platform(#[from] SupabaseError),
}

/// Load the configuration from the environment and summarize it.
///
/// Secrets are redacted; the summary is safe to paste into a support
/// ticket.
///
/// # Errors
///
/// Returns `CheckError::Config` if required variables are missing or
/// fail validation.
pub fn config() -> Result<AppConfig, CheckError> {
    let config = AppConfig::from_env()?;

    info!("Configuration loaded successfully");
    info!("  Bind address: {}", config.socket_addr());
    info!("  Base URL: {}", config.base_url);
    info!("  Platform URL: {}", config.supabase.url);
    info!(
        "  Cache: stale after {:?}, {} retry(s)",
        config.cache.stale_after, config.cache.retry_limit
    );
    if config.sentry_dsn.is_some() {
        info!(
            "  Sentry: enabled (environment: {})",
            config.sentry_environment.as_deref().unwrap_or("default")
        );
    } else {
        info!("  Sentry: disabled");
    }

    Ok(config)
}

/// Probe the hosted data platform's auth service.
///
/// Uses the anonymous key, the same way the web server's readiness
/// endpoint does.
///
/// # Errors
///
/// Returns `CheckError::Platform` if the service is unreachable or
/// reports unhealthy.
pub async fn platform() -> Result<(), CheckError> {
    let config = AppConfig::from_env()?;
    let client = SupabaseClient::new(&config.supabase);

    info!("Probing {} ...", config.supabase.url);
    client.auth().health().await?;
    info!("Platform auth service is healthy");

    Ok(())
}
