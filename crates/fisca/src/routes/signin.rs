// Sign-in route — password authentication pass-through.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fisca_core::identity::{AuthenticatedUser, IdentityError};

use crate::context::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub ok: bool,
    pub message: String,
    pub access_token: String,
    pub user: AuthenticatedUser,
}

pub async fn handle_sign_in(
    ctx: Arc<AppContext>,
    body: SignInRequest,
) -> Result<SignInResponse, SignInHandlerError> {
    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(SignInHandlerError::MissingCredentials),
    };

    let grant = ctx
        .identity
        .sign_in(&email, &password)
        .await
        .map_err(|err| match err {
            IdentityError::InvalidCredentials => SignInHandlerError::InvalidCredentials,
            other => SignInHandlerError::Identity(other),
        })?;

    Ok(SignInResponse {
        ok: true,
        message: "Connexion réussie".to_string(),
        access_token: grant.access_token,
        user: grant.user,
    })
}

/// Typed error for the sign-in handler.
#[derive(Debug)]
pub enum SignInHandlerError {
    /// 400, one of the fields is absent or empty.
    MissingCredentials,
    /// 401, the provider did not accept the credentials.
    InvalidCredentials,
    /// 500, details logged, generic message on the wire.
    Identity(IdentityError),
}

impl SignInHandlerError {
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredentials => "Email et mot de passe requis".to_string(),
            Self::InvalidCredentials => "Identifiants invalides".to_string(),
            Self::Identity(_) => "Erreur serveur".to_string(),
        }
    }
}

impl std::fmt::Display for SignInHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "email or password missing"),
            Self::InvalidCredentials => write!(f, "credentials refused by the provider"),
            Self::Identity(err) => write!(f, "identity provider failure: {err}"),
        }
    }
}

impl std::error::Error for SignInHandlerError {}
