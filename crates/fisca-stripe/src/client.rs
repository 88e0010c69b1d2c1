//! Stripe REST client implementing the billing processor contract.
//!
//! All calls go over Stripe's form-encoded `/v1` API with the secret key
//! as a bearer token.

use async_trait::async_trait;

use fisca_core::billing::{
    BillingError, BillingProcessor, CheckoutSession, PortalSession, ProcessorCustomer,
};

use crate::config::StripeConfig;
use crate::types::{
    CheckoutSessionResponse, CustomerListResponse, CustomerObject, PortalSessionResponse,
};

#[derive(Debug, Clone)]
pub struct StripeClient {
    config: StripeConfig,
    http: reqwest::Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    /// Form body for a subscription checkout. The subject id rides along in
    /// metadata so the session can be traced back to a user.
    fn checkout_form(&self, price_id: &str, email: &str, subject_id: &str) -> Vec<(String, String)> {
        let base = &self.config.app_base_url;
        vec![
            ("mode".to_string(), "subscription".to_string()),
            ("customer_email".to_string(), email.to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "success_url".to_string(),
                format!("{base}/billing/success?session_id={{CHECKOUT_SESSION_ID}}"),
            ),
            ("cancel_url".to_string(), format!("{base}/billing/cancel")),
            ("metadata[user_id]".to_string(), subject_id.to_string()),
            ("metadata[user_email]".to_string(), email.to_string()),
            (
                "subscription_data[metadata][user_id]".to_string(),
                subject_id.to_string(),
            ),
            (
                "subscription_data[metadata][user_email]".to_string(),
                email.to_string(),
            ),
        ]
    }
}

/// Fold a non-success response into a processor error, keeping the body
/// for diagnostics. 4xx means the request was refused, not that Stripe
/// is down.
async fn response_error(response: reqwest::Response) -> BillingError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_client_error() {
        BillingError::Rejected(format!("{status}: {body}"))
    } else {
        BillingError::Unavailable(format!("{status}: {body}"))
    }
}

fn transport_error(err: reqwest::Error) -> BillingError {
    BillingError::Unavailable(err.to_string())
}

#[async_trait]
impl BillingProcessor for StripeClient {
    async fn create_checkout_session(
        &self,
        email: &str,
        subject_id: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let Some(price_id) = self.config.price_id.clone() else {
            return Err(BillingError::NotConfigured);
        };

        let form = self.checkout_form(&price_id, email, subject_id);
        let response = self
            .http
            .post(self.endpoint("/v1/checkout/sessions"))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(response_error(response).await);
        }

        let session: CheckoutSessionResponse =
            response.json().await.map_err(transport_error)?;
        tracing::debug!(session = %session.id, "checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProcessorCustomer>, BillingError> {
        let response = self
            .http
            .get(self.endpoint("/v1/customers"))
            .bearer_auth(&self.config.secret_key)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(response_error(response).await);
        }

        let list: CustomerListResponse = response.json().await.map_err(transport_error)?;
        Ok(list.data.into_iter().next().map(|customer| ProcessorCustomer {
            id: customer.id,
            email: customer.email,
        }))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, BillingError> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            (
                "return_url".to_string(),
                format!("{}/billing/portal-return", self.config.app_base_url),
            ),
        ];

        let response = self
            .http
            .post(self.endpoint("/v1/billing_portal/sessions"))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(response_error(response).await);
        }

        let portal: PortalSessionResponse = response.json().await.map_err(transport_error)?;
        Ok(PortalSession { url: portal.url })
    }

    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, BillingError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/v1/customers/{customer_id}")))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(response_error(response).await);
        }

        let customer: CustomerObject = response.json().await.map_err(transport_error)?;
        Ok(customer.email)
    }
}
