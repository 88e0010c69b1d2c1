use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Caller resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

/// Token and user pair returned by a password sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGrant {
    pub access_token: String,
    pub user: AuthenticatedUser,
}

/// Where a request came from. The anonymous form exists for logging only;
/// quota accounting keys on authenticated subject ids, never on network
/// addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerIdentity {
    Anonymous { network_address: String },
    Authenticated(AuthenticatedUser),
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallerIdentity::Anonymous { network_address } => {
                write!(f, "anonymous({network_address})")
            }
            CallerIdentity::Authenticated(user) => write!(f, "user({})", user.id),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    /// The provider refused the operation, with its own message
    /// (already-registered email, weak password rules, ...).
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// External identity provider: token verification, account lifecycle, and
/// the user directory the billing synchronizer resolves emails against.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to the authenticated caller.
    async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, IdentityError>;

    /// Registers a new user. `redirect_to` is the email-confirmation
    /// landing URL.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<AuthenticatedUser, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionGrant, IdentityError>;

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;

    /// Directory lookup by exact email match.
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AuthenticatedUser>, IdentityError>;
}
