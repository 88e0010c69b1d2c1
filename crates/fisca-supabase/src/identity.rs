//! Identity provider backed by Supabase GoTrue.
//!
//! Speaks the `/auth/v1` REST surface directly: token verification,
//! password sign-up/sign-in, logout, and the admin user listing used to
//! resolve billing emails back to subjects.

use async_trait::async_trait;
use serde::Deserialize;

use fisca_core::identity::{AuthenticatedUser, IdentityError, IdentityProvider, SessionGrant};

use crate::config::SupabaseConfig;

#[derive(Debug, Clone)]
pub struct SupabaseIdentity {
    config: SupabaseConfig,
    http: reqwest::Client,
}

// ─── Wire payloads ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// With email confirmation enabled GoTrue answers a signup with the bare
/// user at the top level; with autoconfirm it nests the user inside a
/// session. Both shapes land here.
#[derive(Debug, Deserialize)]
struct SignUpPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserListPayload {
    users: Vec<UserPayload>,
}

fn user_from(payload: UserPayload) -> AuthenticatedUser {
    AuthenticatedUser {
        id: payload.id,
        email: payload.email.unwrap_or_default(),
    }
}

/// Pull a human-readable message out of a GoTrue error body. The field
/// name varies by endpoint and version.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.to_string()
}

fn transport(err: reqwest::Error) -> IdentityError {
    IdentityError::Unavailable(err.to_string())
}

// ─── Provider ──────────────────────────────────────────────────────

impl SupabaseIdentity {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.config.url, path)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, IdentityError> {
        let response = self
            .http
            .get(self.endpoint("/user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(IdentityError::InvalidToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Unavailable(format!("{status}: {body}")));
        }

        let payload: UserPayload = response.json().await.map_err(transport)?;
        Ok(user_from(payload))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let response = self
            .http
            .post(self.endpoint("/signup"))
            .header("apikey", &self.config.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            return Err(if status.is_client_error() {
                IdentityError::Rejected(message)
            } else {
                IdentityError::Unavailable(format!("{status}: {message}"))
            });
        }

        let payload: SignUpPayload = response.json().await.map_err(transport)?;
        match (payload.user, payload.id) {
            (Some(user), _) => Ok(user_from(user)),
            (None, Some(id)) => Ok(AuthenticatedUser {
                id,
                email: payload.email.unwrap_or_else(|| email.to_string()),
            }),
            (None, None) => Err(IdentityError::Unavailable(
                "signup response carried no user".to_string(),
            )),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionGrant, IdentityError> {
        let response = self
            .http
            .post(self.endpoint("/token"))
            .header("apikey", &self.config.anon_key)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, detail = %error_message(&body), "password grant refused");
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Unavailable(format!("{status}: {body}")));
        }

        let payload: TokenPayload = response.json().await.map_err(transport)?;
        Ok(SessionGrant {
            access_token: payload.access_token,
            user: user_from(payload.user),
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(self.endpoint("/logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        Err(if status.is_client_error() {
            IdentityError::Rejected(message)
        } else {
            IdentityError::Unavailable(format!("{status}: {message}"))
        })
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AuthenticatedUser>, IdentityError> {
        // The admin list endpoint has no exact-match filter, so matching
        // happens client side.
        let response = self
            .http
            .get(self.endpoint("/admin/users"))
            .header("apikey", self.config.admin_key())
            .bearer_auth(self.config.admin_key())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Unavailable(format!(
                "{status}: {}",
                error_message(&body)
            )));
        }

        let payload: UserListPayload = response.json().await.map_err(transport)?;
        Ok(payload
            .users
            .into_iter()
            .find(|user| user.email.as_deref() == Some(email))
            .map(user_from))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────
