//! Stripe webhook signature verification and event decoding.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use fisca_core::billing::{BillingEvent, SubscriptionStatus};

use crate::error::StripeError;
use crate::types::{CheckoutSessionObject, SubscriptionObject, WebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Verify a Stripe webhook signature against the raw request body.
///
/// Stripe-Signature header format: `t=<timestamp>,v1=<signature>`
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), StripeError> {
    let parts: std::collections::HashMap<&str, &str> = signature_header
        .split(',')
        .filter_map(|part| {
            let mut kv = part.splitn(2, '=');
            Some((kv.next()?, kv.next()?))
        })
        .collect();

    let timestamp = parts.get("t").ok_or(StripeError::WebhookSignatureInvalid)?;
    let signature = parts.get("v1").ok_or(StripeError::WebhookSignatureInvalid)?;

    // Build the signed payload: timestamp.payload
    let signed_payload = format!(
        "{}.{}",
        timestamp,
        std::str::from_utf8(payload).map_err(|_| StripeError::WebhookSignatureInvalid)?
    );

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| StripeError::WebhookSignatureInvalid)?;
    mac.update(signed_payload.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison
    if subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(StripeError::WebhookSignatureInvalid)
    }
}

/// Webhook event types this service consumes.
pub const SUPPORTED_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "customer.subscription.updated",
    "customer.subscription.deleted",
];

/// Check if a webhook event type is supported.
pub fn is_supported_event(event_type: &str) -> bool {
    SUPPORTED_EVENTS.contains(&event_type)
}

/// Verify the signature, then decode the envelope.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<WebhookEvent, StripeError> {
    verify_webhook_signature(payload, signature_header, webhook_secret)?;
    serde_json::from_slice(payload).map_err(|_| StripeError::WebhookPayloadInvalid)
}

/// Parse subscription status from a Stripe subscription object.
pub fn parse_subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "canceled" => SubscriptionStatus::Canceled,
        "incomplete" => SubscriptionStatus::Incomplete,
        "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
        "past_due" => SubscriptionStatus::PastDue,
        "trialing" => SubscriptionStatus::Trialing,
        "unpaid" => SubscriptionStatus::Unpaid,
        "paused" => SubscriptionStatus::Paused,
        _ => SubscriptionStatus::Incomplete,
    }
}

/// Translate a verified envelope into the synchronizer's vocabulary.
/// Returns `None` for event types this service does not consume.
pub fn to_billing_event(event: &WebhookEvent) -> Result<Option<BillingEvent>, StripeError> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject =
                serde_json::from_value(event.data.object.clone())
                    .map_err(|_| StripeError::WebhookPayloadInvalid)?;
            Ok(Some(BillingEvent::CheckoutCompleted {
                customer_id: session.customer,
                subscription_id: session.subscription,
                email: session.customer_details.and_then(|details| details.email),
            }))
        }
        "customer.subscription.updated" => {
            let subscription: SubscriptionObject =
                serde_json::from_value(event.data.object.clone())
                    .map_err(|_| StripeError::WebhookPayloadInvalid)?;
            Ok(Some(BillingEvent::SubscriptionUpdated {
                customer_id: subscription.customer,
                subscription_id: subscription.id,
                status: parse_subscription_status(&subscription.status),
            }))
        }
        "customer.subscription.deleted" => {
            let subscription: SubscriptionObject =
                serde_json::from_value(event.data.object.clone())
                    .map_err(|_| StripeError::WebhookPayloadInvalid)?;
            Ok(Some(BillingEvent::SubscriptionDeleted {
                customer_id: subscription.customer,
                subscription_id: subscription.id,
            }))
        }
        _ => Ok(None),
    }
}
