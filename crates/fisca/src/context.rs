// Application context — shared state handed to every route handler.

use std::sync::Arc;

use fisca_core::billing::BillingProcessor;
use fisca_core::completion::Completion;
use fisca_core::identity::IdentityProvider;
use fisca_core::options::FiscaOptions;
use fisca_core::store::{ConversationStore, EntitlementStore};

use crate::billing::BillingSynchronizer;
use crate::conversation::ConversationLog;
use crate::quota::QuotaEngine;

/// The two persistence seams. Present together or not at all: quota and
/// history live in the same backend.
pub struct Stores {
    pub entitlements: Arc<dyn EntitlementStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

/// Collaborators the context is assembled from, all injected.
pub struct Dependencies {
    pub identity: Arc<dyn IdentityProvider>,
    pub completion: Arc<dyn Completion>,
    pub billing: Option<Arc<dyn BillingProcessor>>,
    pub stores: Option<Stores>,
}

/// Shared application state, built once at startup.
///
/// Persistence is the one optional capability, decided here and nowhere
/// else: without stores the context carries no quota engine, no history
/// and no synchronizer, and every ask is admitted without accounting.
pub struct AppContext {
    pub options: FiscaOptions,
    pub identity: Arc<dyn IdentityProvider>,
    pub completion: Arc<dyn Completion>,
    pub billing: Option<Arc<dyn BillingProcessor>>,
    pub quota: Option<QuotaEngine>,
    pub history: Option<ConversationLog>,
    pub sync: Option<BillingSynchronizer>,
}

impl AppContext {
    pub fn new(options: FiscaOptions, deps: Dependencies) -> Arc<Self> {
        let (quota, history, sync) = match deps.stores {
            Some(stores) => {
                let quota =
                    QuotaEngine::new(stores.entitlements.clone(), options.free_question_limit);
                let history = ConversationLog::new(stores.conversations);
                let sync = BillingSynchronizer::new(
                    stores.entitlements,
                    deps.identity.clone(),
                    deps.billing.clone(),
                );
                (Some(quota), Some(history), Some(sync))
            }
            None => {
                tracing::warn!(
                    "no persistence configured; quota and history disabled, every ask admitted"
                );
                (None, None, None)
            }
        };

        Arc::new(Self {
            options,
            identity: deps.identity,
            completion: deps.completion,
            billing: deps.billing,
            quota,
            history,
            sync,
        })
    }

    /// True when quota, history and webhook state can be persisted.
    pub fn has_persistence(&self) -> bool {
        self.quota.is_some()
    }
}

// Secrets live inside `options`; only shape and capabilities are printed.
impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("app_base_url", &self.options.app_base_url)
            .field("port", &self.options.port)
            .field("free_question_limit", &self.options.free_question_limit)
            .field("persistence", &self.has_persistence())
            .field("billing", &self.billing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use fisca_core::completion::CompletionError;
    use fisca_core::identity::{AuthenticatedUser, IdentityError, SessionGrant};
    use fisca_memory::MemoryStore;

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
        async fn generate(&self, _question: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Unavailable("stub".to_string()))
        }
    }

    #[tokio::test]
    async fn with_stores_builds_the_full_pipeline() {
        let store = MemoryStore::new();
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

        assert!(ctx.has_persistence());
        assert!(ctx.quota.is_some());
        assert!(ctx.history.is_some());
        assert!(ctx.sync.is_some());
    }

    #[tokio::test]
    async fn without_stores_runs_degraded() {
        let ctx = AppContext::new(
            FiscaOptions::default(),
            Dependencies {
                identity: Arc::new(NoIdentity),
                completion: Arc::new(NoCompletion),
                billing: None,
                stores: None,
            },
        );

        assert!(!ctx.has_persistence());
        assert!(ctx.quota.is_none());
        assert!(ctx.history.is_none());
        assert!(ctx.sync.is_none());
    }

    #[test]
    fn debug_output_prints_no_secrets() {
        let mut options = FiscaOptions::default();
        options.billing.secret_key = Some("sk_live_supersecret".to_string());

        let ctx = AppContext::new(
            options,
            Dependencies {
                identity: Arc::new(NoIdentity),
                completion: Arc::new(NoCompletion),
                billing: None,
                stores: None,
            },
        );

        let printed = format!("{ctx:?}");
        assert!(!printed.contains("supersecret"));
        assert!(printed.contains("free_question_limit"));
    }
}
