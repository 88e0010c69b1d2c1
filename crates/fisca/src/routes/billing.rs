// Billing routes — checkout session creation and customer portal access.

use std::sync::Arc;

use serde::Serialize;

use fisca_core::billing::BillingError;
use fisca_core::identity::AuthenticatedUser;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
    pub session_id: String,
    pub checkout_url: String,
}

/// Starts a subscription checkout for the caller.
pub async fn handle_create_checkout(
    ctx: Arc<AppContext>,
    user: &AuthenticatedUser,
) -> Result<CheckoutResponse, CheckoutHandlerError> {
    let Some(processor) = &ctx.billing else {
        return Err(CheckoutHandlerError::Billing(BillingError::NotConfigured));
    };

    let session = processor
        .create_checkout_session(&user.email, &user.id)
        .await
        .map_err(CheckoutHandlerError::Billing)?;

    Ok(CheckoutResponse {
        ok: true,
        session_id: session.id,
        checkout_url: session.url,
    })
}

#[derive(Debug)]
pub enum CheckoutHandlerError {
    /// 500 in every case; the message distinguishes "not configured".
    Billing(BillingError),
}

impl CheckoutHandlerError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Billing(BillingError::NotConfigured) => "Stripe non configuré".to_string(),
            Self::Billing(_) => "Erreur création session de paiement".to_string(),
        }
    }
}

impl std::fmt::Display for CheckoutHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Billing(err) => write!(f, "checkout failed: {err}"),
        }
    }
}

impl std::error::Error for CheckoutHandlerError {}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub ok: bool,
    pub portal_url: String,
}

/// Opens the processor's customer portal for the caller.
///
/// The caller's email is looked up in the processor's customer records;
/// having none means there is no subscription to manage, a 404.
pub async fn handle_portal(
    ctx: Arc<AppContext>,
    user: &AuthenticatedUser,
) -> Result<PortalResponse, PortalHandlerError> {
    let Some(processor) = &ctx.billing else {
        return Err(PortalHandlerError::Billing(BillingError::NotConfigured));
    };

    let Some(customer) = processor
        .find_customer_by_email(&user.email)
        .await
        .map_err(PortalHandlerError::Billing)?
    else {
        return Err(PortalHandlerError::NoCustomer);
    };

    let portal = processor
        .create_portal_session(&customer.id)
        .await
        .map_err(PortalHandlerError::Billing)?;

    Ok(PortalResponse {
        ok: true,
        portal_url: portal.url,
    })
}

#[derive(Debug)]
pub enum PortalHandlerError {
    /// 404, the caller has no processor customer record.
    NoCustomer,
    /// 500 otherwise.
    Billing(BillingError),
}

impl PortalHandlerError {
    pub fn user_message(&self) -> String {
        match self {
            Self::NoCustomer => "Aucun abonnement trouvé pour cet utilisateur".to_string(),
            Self::Billing(BillingError::NotConfigured) => "Stripe non configuré".to_string(),
            Self::Billing(_) => "Erreur accès au portail client".to_string(),
        }
    }
}

impl std::fmt::Display for PortalHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCustomer => write!(f, "no processor customer for caller"),
            Self::Billing(err) => write!(f, "portal failed: {err}"),
        }
    }
}

impl std::error::Error for PortalHandlerError {}
