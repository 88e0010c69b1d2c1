//! Stripe wire types, reduced to the fields this service consumes.

use serde::{Deserialize, Serialize};

/// Webhook event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
    pub created: i64,
}

/// Webhook event data object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// `checkout.session` object as it arrives in a webhook. The customer id
/// can be absent when checkout ran without an existing customer.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// `subscription` object as it arrives in a webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
}

/// `customer` object from the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerObject {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response to `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
    pub url: String,
}

/// Response to `POST /v1/billing_portal/sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalSessionResponse {
    pub url: String,
}

/// Response to `GET /v1/customers?email=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerListResponse {
    pub data: Vec<CustomerObject>,
}
