//! Stripe integration tests.
//!
//! Covers: webhook signature verification, event decoding, billing
//! event translation, subscription status, config, types, and errors.

use fisca_core::billing::{BillingEvent, SubscriptionStatus};
use fisca_stripe::webhook::*;
use fisca_stripe::{StripeConfig, StripeError};

// ── Webhook signature ───────────────────────────────────────────

fn sign(payload: &[u8], timestamp: &str, secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    type HmacSha256 = Hmac<Sha256>;

    let signed = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[test]
fn verify_valid_webhook_signature() {
    let secret = "whsec_test_secret_key";
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = sign(payload, "1614556800", secret);
    assert!(verify_webhook_signature(payload, &header, secret).is_ok());
}

#[test]
fn reject_invalid_webhook_signature() {
    let result = verify_webhook_signature(b"payload", "t=123,v1=definitely_invalid", "secret");
    assert!(result.is_err());
}

#[test]
fn reject_missing_timestamp() {
    let result = verify_webhook_signature(b"payload", "v1=abc", "secret");
    assert!(result.is_err());
}

#[test]
fn reject_missing_signature() {
    let result = verify_webhook_signature(b"payload", "t=123", "secret");
    assert!(result.is_err());
}

#[test]
fn reject_empty_header() {
    let result = verify_webhook_signature(b"payload", "", "secret");
    assert!(result.is_err());
}

#[test]
fn reject_wrong_secret() {
    let payload = b"{\"type\":\"test\"}";
    let header = sign(payload, "1614556800", "whsec_right");
    assert!(verify_webhook_signature(payload, &header, "whsec_wrong").is_err());
}

// ── Supported events ────────────────────────────────────────────

#[test]
fn lifecycle_events_are_supported() {
    assert!(is_supported_event("checkout.session.completed"));
    assert!(is_supported_event("customer.subscription.updated"));
    assert!(is_supported_event("customer.subscription.deleted"));
}

#[test]
fn unrelated_events_not_supported() {
    assert!(!is_supported_event("invoice.paid"));
    assert!(!is_supported_event("charge.succeeded"));
    assert!(!is_supported_event(""));
}

// ── Billing event translation ───────────────────────────────────

fn envelope(event_type: &str, object: serde_json::Value) -> fisca_stripe::types::WebhookEvent {
    serde_json::from_value(serde_json::json!({
        "id": "evt_1",
        "type": event_type,
        "data": {"object": object},
        "created": 1714000000,
    }))
    .unwrap()
}

#[test]
fn checkout_completed_maps_customer_and_email() {
    let event = envelope(
        "checkout.session.completed",
        serde_json::json!({
            "id": "cs_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "customer_details": {"email": "a@b.fr"},
        }),
    );

    let billing = to_billing_event(&event).unwrap().unwrap();
    assert_eq!(
        billing,
        BillingEvent::CheckoutCompleted {
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            email: Some("a@b.fr".to_string()),
        }
    );
}

#[test]
fn checkout_completed_tolerates_missing_customer() {
    let event = envelope(
        "checkout.session.completed",
        serde_json::json!({"customer_details": {"email": "a@b.fr"}}),
    );

    let billing = to_billing_event(&event).unwrap().unwrap();
    assert_eq!(
        billing,
        BillingEvent::CheckoutCompleted {
            customer_id: None,
            subscription_id: None,
            email: Some("a@b.fr".to_string()),
        }
    );
}

#[test]
fn subscription_updated_maps_status() {
    let event = envelope(
        "customer.subscription.updated",
        serde_json::json!({"id": "sub_1", "customer": "cus_1", "status": "active"}),
    );

    let billing = to_billing_event(&event).unwrap().unwrap();
    assert_eq!(
        billing,
        BillingEvent::SubscriptionUpdated {
            customer_id: "cus_1".to_string(),
            subscription_id: "sub_1".to_string(),
            status: SubscriptionStatus::Active,
        }
    );
}

#[test]
fn subscription_deleted_maps_ids() {
    let event = envelope(
        "customer.subscription.deleted",
        serde_json::json!({"id": "sub_1", "customer": "cus_1", "status": "canceled"}),
    );

    let billing = to_billing_event(&event).unwrap().unwrap();
    assert_eq!(
        billing,
        BillingEvent::SubscriptionDeleted {
            customer_id: "cus_1".to_string(),
            subscription_id: "sub_1".to_string(),
        }
    );
}

#[test]
fn unconsumed_event_translates_to_none() {
    let event = envelope("invoice.paid", serde_json::json!({"id": "in_1"}));
    assert!(to_billing_event(&event).unwrap().is_none());
}

#[test]
fn malformed_subscription_object_is_rejected() {
    let event = envelope("customer.subscription.updated", serde_json::json!({"id": 42}));
    assert_eq!(
        to_billing_event(&event),
        Err(StripeError::WebhookPayloadInvalid)
    );
}

// ── Subscription status ─────────────────────────────────────────

#[test]
fn parse_known_statuses() {
    assert_eq!(parse_subscription_status("active"), SubscriptionStatus::Active);
    assert_eq!(parse_subscription_status("canceled"), SubscriptionStatus::Canceled);
    assert_eq!(parse_subscription_status("trialing"), SubscriptionStatus::Trialing);
    assert_eq!(parse_subscription_status("past_due"), SubscriptionStatus::PastDue);
    assert_eq!(parse_subscription_status("unpaid"), SubscriptionStatus::Unpaid);
    assert_eq!(parse_subscription_status("paused"), SubscriptionStatus::Paused);
    assert_eq!(
        parse_subscription_status("incomplete_expired"),
        SubscriptionStatus::IncompleteExpired
    );
}

#[test]
fn parse_unknown_defaults_to_incomplete() {
    assert_eq!(
        parse_subscription_status("unknown_status"),
        SubscriptionStatus::Incomplete
    );
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn config_builder_sets_price() {
    let config = StripeConfig::new("sk_test", "http://localhost:3010").with_price_id("price_1");
    assert_eq!(config.price_id.as_deref(), Some("price_1"));
}

// ── Types serde ─────────────────────────────────────────────────

#[test]
fn webhook_event_deser() {
    let v = serde_json::json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {"id": "cs_test"}
        },
        "created": 1714000000
    });
    let event: fisca_stripe::types::WebhookEvent = serde_json::from_value(v).unwrap();
    assert_eq!(event.event_type, "checkout.session.completed");
    assert_eq!(event.data.object["id"], "cs_test");
}

#[test]
fn error_display() {
    let err = StripeError::WebhookSignatureInvalid;
    assert_eq!(err.code(), "WEBHOOK_SIGNATURE_INVALID");
    assert!(!format!("{}", err).is_empty());
}
