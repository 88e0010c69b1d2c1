use crate::billing::BillingError;
use crate::completion::CompletionError;
use crate::identity::IdentityError;
use crate::store::StoreError;

/// Umbrella error for fallible setup and cross-seam paths. Route handlers
/// use their own narrower enums; this type is for construction-time code
/// and the binary edge.
#[derive(Debug, thiserror::Error)]
pub enum FiscaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FiscaError>;
