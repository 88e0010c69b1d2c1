use std::sync::Arc;

use fisca_core::model::Message;
use fisca_core::store::{ConversationStore, StoreError};

/// Fixed retrieval window for recent history.
pub const RECENT_MESSAGES: usize = 10;

/// Append-only question/answer history with bounded retrieval. No
/// mutation or deletion surface exists.
#[derive(Clone)]
pub struct ConversationLog {
    store: Arc<dyn ConversationStore>,
}

impl ConversationLog {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn append(
        &self,
        subject_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Message, StoreError> {
        self.store.append_message(subject_id, question, answer).await
    }

    /// Latest messages, newest first, capped at [`RECENT_MESSAGES`].
    pub async fn recent(&self, subject_id: &str) -> Result<Vec<Message>, StoreError> {
        self.store
            .recent_messages(subject_id, RECENT_MESSAGES)
            .await
    }
}
