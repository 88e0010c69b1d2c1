use async_trait::async_trait;

use crate::model::{EntitlementRecord, EntitlementUpdate, Message};

/// Failure surfaced by a persistence backend. Distinct from any admission
/// outcome: a caller must never read one of these as "admitted".
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("stored value malformed: {0}")]
    Corrupt(String),
}

/// Outcome of the atomic counter advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The counter moved to `count`; the request may proceed.
    Admitted { count: i64 },
    /// The ceiling was already reached; nothing was written.
    LimitReached { count: i64 },
}

/// Subscription state and usage counters.
///
/// Writer discipline: the quota engine advances counters and only reads
/// plans; the billing synchronizer writes plans and processor ids and
/// never touches counters.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn find_entitlement(
        &self,
        subject_id: &str,
    ) -> Result<Option<EntitlementRecord>, StoreError>;

    /// Insert-or-update keyed on subject id. Processor ids in `update`
    /// replace stored values only when set.
    async fn upsert_entitlement(
        &self,
        update: EntitlementUpdate,
    ) -> Result<EntitlementRecord, StoreError>;

    /// Current count for `(subject_id, period)`. A missing row reads as 0.
    async fn usage_count(&self, subject_id: &str, period: &str) -> Result<i64, StoreError>;

    /// Advances the counter by one unless it already sits at `ceiling`.
    /// Check and increment are one atomic unit per `(subject_id, period)`:
    /// of two concurrent calls arriving at `ceiling - 1`, exactly one is
    /// admitted.
    async fn increment_usage(
        &self,
        subject_id: &str,
        period: &str,
        ceiling: i64,
    ) -> Result<IncrementOutcome, StoreError>;
}

/// Append-only question/answer history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append_message(
        &self,
        subject_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Message, StoreError>;

    /// Most recent messages for the subject, newest first, at most `limit`.
    async fn recent_messages(
        &self,
        subject_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;
}
