//! # fisca-core
//!
//! Shared foundation for the fisca service: the entitlement/usage data
//! model, the narrow traits every external collaborator is injected
//! behind, configuration, and logging bootstrap.

pub mod billing;
pub mod completion;
pub mod env;
pub mod error;
pub mod identity;
pub mod model;
pub mod options;
pub mod store;

// Re-exports for convenience
pub use billing::{
    BillingError, BillingEvent, BillingProcessor, CheckoutSession, PortalSession,
    ProcessorCustomer, SubscriptionStatus,
};
pub use completion::{Completion, CompletionError};
pub use error::{FiscaError, Result};
pub use identity::{
    AuthenticatedUser, CallerIdentity, IdentityError, IdentityProvider, SessionGrant,
};
pub use model::{
    period_key, Allowance, EntitlementRecord, EntitlementUpdate, Message, Plan, UsageCounter,
    UsageSnapshot, UNLIMITED_LABEL,
};
pub use options::{BillingOptions, CompletionOptions, FiscaOptions, IdentityOptions};
pub use store::{ConversationStore, EntitlementStore, IncrementOutcome, StoreError};
