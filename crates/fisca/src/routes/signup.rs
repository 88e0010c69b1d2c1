// Sign-up route — registration pass-through to the identity provider
// with local validation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fisca_core::identity::{AuthenticatedUser, IdentityError};

use crate::context::AppContext;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub ok: bool,
    pub message: String,
    pub user: AuthenticatedUser,
}

/// Handle registration.
///
/// 1. Both fields present and non-empty
/// 2. Password at least six characters
/// 3. Delegate to the provider with the email-confirmation redirect
pub async fn handle_sign_up(
    ctx: Arc<AppContext>,
    body: SignUpRequest,
) -> Result<SignUpResponse, SignUpHandlerError> {
    // 1. Both fields present and non-empty
    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(SignUpHandlerError::MissingCredentials),
    };

    // 2. Password length
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SignUpHandlerError::PasswordTooShort);
    }

    // 3. Provider call; confirmation emails land on the app's callback
    let redirect_to = format!("{}/auth/callback", ctx.options.app_base_url);
    let user = ctx
        .identity
        .sign_up(&email, &password, &redirect_to)
        .await
        .map_err(|err| match err {
            IdentityError::Rejected(message) => SignUpHandlerError::Rejected(message),
            other => SignUpHandlerError::Identity(other),
        })?;

    Ok(SignUpResponse {
        ok: true,
        message: "Inscription réussie. Vérifiez votre email pour confirmer votre compte."
            .to_string(),
        user,
    })
}

/// Typed error for the sign-up handler.
#[derive(Debug)]
pub enum SignUpHandlerError {
    /// 400, one of the fields is absent or empty.
    MissingCredentials,
    /// 400, password below [`MIN_PASSWORD_CHARS`].
    PasswordTooShort,
    /// 400, the provider refused with its own message.
    Rejected(String),
    /// 500, details logged, generic message on the wire.
    Identity(IdentityError),
}

impl SignUpHandlerError {
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredentials => "Email et mot de passe requis".to_string(),
            Self::PasswordTooShort => {
                "Le mot de passe doit contenir au moins 6 caractères".to_string()
            }
            Self::Rejected(message) => message.clone(),
            Self::Identity(_) => "Erreur serveur".to_string(),
        }
    }
}

impl std::fmt::Display for SignUpHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "email or password missing"),
            Self::PasswordTooShort => write!(f, "password shorter than {MIN_PASSWORD_CHARS} characters"),
            Self::Rejected(message) => write!(f, "provider rejected sign-up: {message}"),
            Self::Identity(err) => write!(f, "identity provider failure: {err}"),
        }
    }
}

impl std::error::Error for SignUpHandlerError {}
