// Me route — caller profile with the current plan.

use std::sync::Arc;

use serde::Serialize;

use fisca_core::identity::AuthenticatedUser;
use fisca_core::model::Plan;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub ok: bool,
    pub user: MeUser,
}

#[derive(Debug, Serialize)]
pub struct MeUser {
    pub id: String,
    pub email: String,
    pub plan: Plan,
}

/// Reports the authenticated caller with their plan. A failed plan read
/// falls back to free rather than failing the request.
pub async fn handle_me(ctx: Arc<AppContext>, user: &AuthenticatedUser) -> MeResponse {
    let plan = match &ctx.quota {
        Some(quota) => match quota.plan(&user.id).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(subject = %user.id, error = %err, "plan lookup failed, reporting free");
                Plan::Free
            }
        },
        None => Plan::Free,
    };

    MeResponse {
        ok: true,
        user: MeUser {
            id: user.id.clone(),
            email: user.email.clone(),
            plan,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use fisca_core::identity::{IdentityError, IdentityProvider, SessionGrant};
    use fisca_core::model::EntitlementUpdate;
    use fisca_core::options::FiscaOptions;
    use fisca_core::EntitlementStore;
    use fisca_memory::MemoryStore;

    use crate::context::{Dependencies, Stores};

    struct NoIdentity;

    #[async_trait]
    impl IdentityProvider for NoIdentity {
        async fn verify_token(&self, _token: &str) -> Result<AuthenticatedUser, IdentityError> {
            Err(IdentityError::InvalidToken)
        }

        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            _redirect_to: &str,
        ) -> Result<AuthenticatedUser, IdentityError> {
            Err(IdentityError::Unavailable("stub".to_string()))
        }

        async fn sign_in(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<SessionGrant, IdentityError> {
            Err(IdentityError::InvalidCredentials)
        }

        async fn sign_out(&self, _token: &str) -> Result<(), IdentityError> {
            Ok(())
        }

        async fn find_user_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<AuthenticatedUser>, IdentityError> {
            Ok(None)
        }
    }

    struct NoCompletion;

    #[async_trait]
    impl fisca_core::completion::Completion for NoCompletion {
        async fn generate(
            &self,
            _question: &str,
        ) -> Result<String, fisca_core::completion::CompletionError> {
            Err(fisca_core::completion::CompletionError::Unavailable(
                "stub".to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn reports_the_stored_plan_or_free() {
        let store = MemoryStore::new();
        store
            .upsert_entitlement(EntitlementUpdate {
                subject_id: "pro-user".to_string(),
                email: "pro@example.fr".to_string(),
                plan: Plan::Pro,
                processor_customer_id: None,
                processor_subscription_id: None,
            })
            .await
            .unwrap();

        let ctx = AppContext::new(
            FiscaOptions::default(),
            Dependencies {
                identity: Arc::new(NoIdentity),
                completion: Arc::new(NoCompletion),
                billing: None,
                stores: Some(Stores {
                    entitlements: Arc::new(store.clone()),
                    conversations: Arc::new(store),
                }),
            },
        );

        let pro = handle_me(
            ctx.clone(),
            &AuthenticatedUser {
                id: "pro-user".to_string(),
                email: "pro@example.fr".to_string(),
            },
        )
        .await;
        assert_eq!(pro.user.plan, Plan::Pro);

        let unknown = handle_me(
            ctx,
            &AuthenticatedUser {
                id: "new-user".to_string(),
                email: "new@example.fr".to_string(),
            },
        )
        .await;
        assert_eq!(unknown.user.plan, Plan::Free);
        assert!(unknown.ok);
    }
}
