// Billing synchronizer — applies subscription lifecycle events to the
// entitlement store. The only writer of plans and processor ids; it never
// touches usage counters.

use std::sync::Arc;

use fisca_core::billing::{BillingError, BillingEvent, BillingProcessor, SubscriptionStatus};
use fisca_core::identity::{IdentityError, IdentityProvider};
use fisca_core::model::{EntitlementUpdate, Plan};
use fisca_core::store::{EntitlementStore, StoreError};

/// What applying one event did. Unresolvable targets are outcomes rather
/// than errors: the webhook endpoint acknowledges them either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The entitlement row now carries `plan`.
    Applied { subject_id: String, plan: Plan },
    /// The event's subscription status does not change the plan.
    NoChange,
    /// No email could be resolved for the event's customer.
    MissingEmail,
    /// The email matches no user in the identity directory.
    SubjectNotFound { email: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Billing(#[from] BillingError),
}

#[derive(Clone)]
pub struct BillingSynchronizer {
    store: Arc<dyn EntitlementStore>,
    identity: Arc<dyn IdentityProvider>,
    processor: Option<Arc<dyn BillingProcessor>>,
}

impl BillingSynchronizer {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        identity: Arc<dyn IdentityProvider>,
        processor: Option<Arc<dyn BillingProcessor>>,
    ) -> Self {
        Self {
            store,
            identity,
            processor,
        }
    }

    /// Applies one signature-verified event. Idempotent: replaying the same
    /// event settles on the same entitlement row.
    pub async fn apply_event(&self, event: BillingEvent) -> Result<SyncOutcome, SyncError> {
        let kind = event.kind();

        // 1. Derive the target plan from the transition table.
        let (customer_id, subscription_id, event_email, plan) = match event {
            BillingEvent::CheckoutCompleted {
                customer_id,
                subscription_id,
                email,
            } => (customer_id, subscription_id, email, Plan::Pro),
            BillingEvent::SubscriptionUpdated {
                customer_id,
                subscription_id,
                status,
            } => {
                let plan = match status {
                    SubscriptionStatus::Active => Plan::Pro,
                    SubscriptionStatus::Canceled | SubscriptionStatus::Unpaid => Plan::Free,
                    other => {
                        tracing::info!(
                            customer = %customer_id,
                            status = ?other,
                            "subscription status leaves the plan unchanged"
                        );
                        return Ok(SyncOutcome::NoChange);
                    }
                };
                (Some(customer_id), Some(subscription_id), None, plan)
            }
            BillingEvent::SubscriptionDeleted {
                customer_id,
                subscription_id,
            } => (Some(customer_id), Some(subscription_id), None, Plan::Free),
        };

        // 2. Resolve the target email, falling back to the processor's
        //    customer record when the event itself carries none.
        let email = match event_email {
            Some(email) => Some(email),
            None => match (&self.processor, &customer_id) {
                (Some(processor), Some(customer_id)) => {
                    processor.customer_email(customer_id).await?
                }
                _ => None,
            },
        };
        let Some(email) = email else {
            tracing::warn!(
                customer = customer_id.as_deref().unwrap_or("unknown"),
                event = kind,
                "no resolvable email for billing event"
            );
            return Ok(SyncOutcome::MissingEmail);
        };

        // 3. Email to subject id through the identity directory.
        let Some(user) = self.identity.find_user_by_email(&email).await? else {
            tracing::warn!(email = %email, event = kind, "billing event matches no known user");
            return Ok(SyncOutcome::SubjectNotFound { email });
        };

        // 4. Upsert keyed on subject id.
        let record = self
            .store
            .upsert_entitlement(EntitlementUpdate {
                subject_id: user.id,
                email,
                plan,
                processor_customer_id: customer_id,
                processor_subscription_id: subscription_id,
            })
            .await?;

        tracing::info!(
            subject = %record.subject_id,
            plan = %record.plan,
            event = kind,
            "entitlement updated"
        );
        Ok(SyncOutcome::Applied {
            subject_id: record.subject_id,
            plan,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────
