//! Stripe client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Stripe REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`).
    pub secret_key: String,
    /// Price the checkout subscribes to. Checkout is refused when unset.
    #[serde(default)]
    pub price_id: Option<String>,
    /// Base URL the success/cancel/portal-return redirects land under.
    pub app_base_url: String,
    /// API origin, overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String { "https://api.stripe.com".to_string() }

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>, app_base_url: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            price_id: None,
            app_base_url: app_base_url.into(),
            api_base: default_api_base(),
        }
    }

    pub fn with_price_id(mut self, price_id: impl Into<String>) -> Self {
        self.price_id = Some(price_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_defaults_to_stripe() {
        let config = StripeConfig::new("sk_test", "http://localhost:3010");
        assert_eq!(config.api_base, "https://api.stripe.com");
        assert!(config.price_id.is_none());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: StripeConfig = serde_json::from_str(
            r#"{"secret_key":"sk_test","app_base_url":"http://localhost:3010"}"#,
        )
        .unwrap();
        assert_eq!(config.api_base, "https://api.stripe.com");
        assert!(config.price_id.is_none());
    }
}
