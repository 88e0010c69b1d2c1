// Sign-out route — session revocation pass-through.

use std::sync::Arc;

use serde::Serialize;

use fisca_core::identity::IdentityError;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub ok: bool,
    pub message: String,
}

/// Revokes the caller's token at the provider. The caller was already
/// authenticated with this same token by the gateway.
pub async fn handle_sign_out(
    ctx: Arc<AppContext>,
    token: &str,
) -> Result<SignOutResponse, SignOutHandlerError> {
    ctx.identity
        .sign_out(token)
        .await
        .map_err(SignOutHandlerError::Identity)?;

    Ok(SignOutResponse {
        ok: true,
        message: "Déconnexion réussie".to_string(),
    })
}

#[derive(Debug)]
pub enum SignOutHandlerError {
    /// 400 when the provider refuses, 500 when it is unreachable.
    Identity(IdentityError),
}

impl SignOutHandlerError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Identity(IdentityError::Rejected(message)) => message.clone(),
            Self::Identity(_) => "Erreur serveur".to_string(),
        }
    }
}

impl std::fmt::Display for SignOutHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(err) => write!(f, "identity provider failure: {err}"),
        }
    }
}

impl std::error::Error for SignOutHandlerError {}
