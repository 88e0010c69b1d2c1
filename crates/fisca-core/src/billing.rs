use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Checkout session handed back to the frontend for redirection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Customer-portal session for managing an existing subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Customer record held by the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorCustomer {
    pub id: String,
    pub email: Option<String>,
}

/// Subscription lifecycle states reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Trialing,
    Unpaid,
    Paused,
}

/// Subscription lifecycle event, post signature verification, carrying
/// what the synchronizer needs to resolve the target identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// A checkout may complete before the processor attaches a customer
    /// id; the email still identifies the subject.
    CheckoutCompleted {
        customer_id: Option<String>,
        subscription_id: Option<String>,
        email: Option<String>,
    },
    SubscriptionUpdated {
        customer_id: String,
        subscription_id: String,
        status: SubscriptionStatus,
    },
    SubscriptionDeleted {
        customer_id: String,
        subscription_id: String,
    },
}

impl BillingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::CheckoutCompleted { .. } => "checkout_completed",
            BillingEvent::SubscriptionUpdated { .. } => "subscription_updated",
            BillingEvent::SubscriptionDeleted { .. } => "subscription_deleted",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BillingError {
    /// The processor client or a required piece of its configuration is
    /// absent.
    #[error("billing processor not configured")]
    NotConfigured,
    #[error("billing processor unavailable: {0}")]
    Unavailable(String),
    #[error("billing processor rejected the request: {0}")]
    Rejected(String),
}

/// Payment processor operations the service initiates. Webhook ingestion
/// is separate: events arrive pushed, are signature-checked at the edge,
/// and reach the synchronizer as [`BillingEvent`]s.
#[async_trait]
pub trait BillingProcessor: Send + Sync {
    /// Starts a subscription checkout for the caller.
    async fn create_checkout_session(
        &self,
        email: &str,
        subject_id: &str,
    ) -> Result<CheckoutSession, BillingError>;

    /// Looks up the processor customer for an email, if any.
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProcessorCustomer>, BillingError>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, BillingError>;

    /// Email on file for a processor customer.
    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, BillingError>;
}
