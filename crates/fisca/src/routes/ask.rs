// Ask route — the primary operation: quota check, answer generation,
// history append, usage snapshot.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fisca_core::completion::CompletionError;
use fisca_core::identity::AuthenticatedUser;
use fisca_core::model::{Allowance, UsageSnapshot};
use fisca_core::store::StoreError;

use crate::context::AppContext;
use crate::quota::QuotaError;

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub ok: bool,
    pub answer: String,
    /// Absent in degraded (no-persistence) mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

/// Handle one question.
///
/// 1. Validate the question
/// 2. Consume quota (consume-then-generate: a failed generation after an
///    admitted check deliberately costs the unit)
/// 3. Generate the answer
/// 4. Append to history; an append failure is logged, not returned
pub async fn handle_ask(
    ctx: Arc<AppContext>,
    user: &AuthenticatedUser,
    body: AskRequest,
) -> Result<AskResponse, AskHandlerError> {
    // 1. Validate the question
    let question = match body.question {
        Some(q) if !q.is_empty() => q,
        _ => return Err(AskHandlerError::MissingQuestion),
    };

    // 2. Consume quota; without persistence the request is admitted with
    //    no accounting and no snapshot
    let usage = match &ctx.quota {
        Some(quota) => Some(quota.check_and_consume(&user.id).await?),
        None => None,
    };

    // 3. Generate the answer
    let answer = ctx.completion.generate(&question).await?;

    // 4. Record the exchange; the answer stands even if the append fails
    if let Some(history) = &ctx.history {
        if let Err(err) = history.append(&user.id, &question, &answer).await {
            tracing::error!(subject = %user.id, error = %err, "failed to record exchange");
        }
    }

    Ok(AskResponse {
        ok: true,
        answer,
        usage,
    })
}

/// Typed error for the ask handler.
#[derive(Debug)]
pub enum AskHandlerError {
    /// 400, question absent, null or empty.
    MissingQuestion,
    /// 429, carries the snapshot the denial body must include.
    QuotaExceeded(UsageSnapshot),
    /// 500, details logged, generic message on the wire.
    Store(StoreError),
    /// 500, details logged, generic message on the wire.
    Completion(CompletionError),
}

impl AskHandlerError {
    /// Message shown to the caller.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingQuestion => "question manquante".to_string(),
            Self::QuotaExceeded(snapshot) => match snapshot.limit {
                Allowance::Limited(limit) => format!(
                    "Vous avez atteint la limite gratuite de {limit} questions ce mois-ci."
                ),
                Allowance::Unlimited => {
                    "Vous avez atteint la limite gratuite de questions ce mois-ci.".to_string()
                }
            },
            Self::Store(_) | Self::Completion(_) => "Erreur serveur".to_string(),
        }
    }
}

impl From<QuotaError> for AskHandlerError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::Exceeded(snapshot) => Self::QuotaExceeded(snapshot),
            QuotaError::Store(err) => Self::Store(err),
        }
    }
}

impl From<CompletionError> for AskHandlerError {
    fn from(err: CompletionError) -> Self {
        Self::Completion(err)
    }
}

impl std::fmt::Display for AskHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingQuestion => write!(f, "question missing or empty"),
            Self::QuotaExceeded(snapshot) => write!(
                f,
                "quota exceeded: {}/{} for period {}",
                snapshot.count, snapshot.limit, snapshot.period
            ),
            Self::Store(err) => write!(f, "store failure: {err}"),
            Self::Completion(err) => write!(f, "completion failure: {err}"),
        }
    }
}

impl std::error::Error for AskHandlerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use fisca_core::identity::{IdentityError, IdentityProvider, SessionGrant};
    use fisca_core::model::Plan;
    use fisca_core::options::FiscaOptions;
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

    /// Completion stub that counts calls and echoes a canned answer.
    struct CannedCompletion {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl fisca_core::completion::Completion for CannedCompletion {
        async fn generate(&self, _question: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("La TVA standard est de 20 %.".to_string())
        }
    }

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: "u1".to_string(),
            email: "u1@example.fr".to_string(),
        }
    }

    fn context_with_store(
        store: &MemoryStore,
        calls: Arc<AtomicUsize>,
    ) -> Arc<AppContext> {
        AppContext::new(
            FiscaOptions::default(),
            Dependencies {
                identity: Arc::new(NoIdentity),
                completion: Arc::new(CannedCompletion { calls }),
                billing: None,
                stores: Some(Stores {
                    entitlements: Arc::new(store.clone()),
                    conversations: Arc::new(store.clone()),
                }),
            },
        )
    }

    #[tokio::test]
    async fn admits_generates_and_records() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context_with_store(&store, calls.clone());

        let response = handle_ask(
            ctx,
            &user(),
            AskRequest {
                question: Some("Quel est le taux de TVA standard ?".to_string()),
            },
        )
        .await
        .unwrap();

        assert!(response.ok);
        assert_eq!(response.answer, "La TVA standard est de 20 %.");
        let usage = response.usage.unwrap();
        assert_eq!(usage.count, 1);
        assert_eq!(usage.limit, Allowance::Limited(5));
        assert_eq!(usage.remaining, Allowance::Limited(4));
        assert_eq!(usage.plan, Plan::Free);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn missing_or_empty_question_is_rejected_before_any_work() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context_with_store(&store, calls.clone());

        for body in [AskRequest { question: None }, AskRequest { question: Some(String::new()) }] {
            let err = handle_ask(ctx.clone(), &user(), body).await.unwrap_err();
            assert!(matches!(err, AskHandlerError::MissingQuestion));
            assert_eq!(err.user_message(), "question manquante");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let period = fisca_core::model::period_key(chrono::Utc::now());
        assert_eq!(store.counter_value("u1", &period).await, 0);
    }

    #[tokio::test]
    async fn exhausted_quota_denies_without_generating() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context_with_store(&store, calls.clone());

        for _ in 0..5 {
            handle_ask(
                ctx.clone(),
                &user(),
                AskRequest {
                    question: Some("q".to_string()),
                },
            )
            .await
            .unwrap();
        }

        let err = handle_ask(
            ctx,
            &user(),
            AskRequest {
                question: Some("q".to_string()),
            },
        )
        .await
        .unwrap_err();

        match &err {
            AskHandlerError::QuotaExceeded(snapshot) => {
                assert_eq!(snapshot.count, 5);
                assert_eq!(snapshot.remaining, Allowance::Limited(0));
            }
            other => panic!("expected quota denial, got {other:?}"),
        }
        assert_eq!(
            err.user_message(),
            "Vous avez atteint la limite gratuite de 5 questions ce mois-ci."
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn degraded_mode_admits_without_usage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = AppContext::new(
            FiscaOptions::default(),
            Dependencies {
                identity: Arc::new(NoIdentity),
                completion: Arc::new(CannedCompletion { calls }),
                billing: None,
                stores: None,
            },
        );

        let response = handle_ask(
            ctx,
            &user(),
            AskRequest {
                question: Some("q".to_string()),
            },
        )
        .await
        .unwrap();

        assert!(response.ok);
        assert!(response.usage.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("usage").is_none());
    }

    #[tokio::test]
    async fn generation_failure_still_costs_the_consumed_unit() {
        struct BrokenCompletion;

        #[async_trait]
        impl fisca_core::completion::Completion for BrokenCompletion {
            async fn generate(&self, _question: &str) -> Result<String, CompletionError> {
                Err(CompletionError::Unavailable("timeout".to_string()))
            }
        }

        let store = MemoryStore::new();
        let ctx = AppContext::new(
            FiscaOptions::default(),
            Dependencies {
                identity: Arc::new(NoIdentity),
                completion: Arc::new(BrokenCompletion),
                billing: None,
                stores: Some(Stores {
                    entitlements: Arc::new(store.clone()),
                    conversations: Arc::new(store.clone()),
                }),
            },
        );

        let err = handle_ask(
            ctx,
            &user(),
            AskRequest {
                question: Some("q".to_string()),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AskHandlerError::Completion(_)));
        assert_eq!(err.user_message(), "Erreur serveur");

        let period = fisca_core::model::period_key(chrono::Utc::now());
        assert_eq!(store.counter_value("u1", &period).await, 1);
        assert_eq!(store.message_count().await, 0);
    }
}
