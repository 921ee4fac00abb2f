//! Edge function calls.
//!
//! Only one function is used: `payment-config`, which hands back the hosted
//! payment widget's client identifier so it never ships in this binary.

use serde::Deserialize;
use tracing::instrument;

use super::{SupabaseClient, SupabaseError, read_json};

#[derive(Debug, Deserialize)]
struct PaymentConfig {
    #[serde(rename = "clientId", default)]
    client_id: Option<String>,
}

/// Client for the platform's edge functions.
#[derive(Clone)]
pub struct FunctionsClient {
    client: SupabaseClient,
}

impl FunctionsClient {
    pub(super) const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// The payment widget client identifier, if one is configured.
    ///
    /// A missing or blank identifier comes back as `None`; callers must
    /// abort checkout rather than render a widget that cannot initialize.
    ///
    /// # Errors
    ///
    /// Returns an error if the function call fails.
    #[instrument(skip(self))]
    pub async fn payment_client_id(&self) -> Result<Option<String>, SupabaseError> {
        let url = self.client.endpoint("functions/v1/payment-config")?;
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.api_key())
            .bearer_auth(self.client.api_key())
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let config: PaymentConfig = read_json(response, "payment-config").await?;
        Ok(config.client_id.filter(|id| !id.trim().is_empty()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_client_id_deserializes_to_some_blank() {
        let config: PaymentConfig = serde_json::from_value(serde_json::json!({
            "clientId": "  ",
        }))
        .unwrap();
        assert_eq!(config.client_id.as_deref(), Some("  "));
    }

    #[test]
    fn missing_client_id_deserializes_to_none() {
        let config: PaymentConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(config.client_id.is_none());
    }
}
