use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use fisca_core::model::{EntitlementRecord, EntitlementUpdate, Message, UsageCounter};
use fisca_core::store::{ConversationStore, EntitlementStore, IncrementOutcome, StoreError};

/// In-memory store. Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entitlements: Arc<RwLock<HashMap<String, EntitlementRecord>>>,
    counters: Arc<RwLock<HashMap<(String, String), UsageCounter>>>,
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value, 0 when absent (for tests and debugging).
    pub async fn counter_value(&self, subject_id: &str, period: &str) -> i64 {
        let counters = self.counters.read().await;
        counters
            .get(&(subject_id.to_string(), period.to_string()))
            .map(|counter| counter.count)
            .unwrap_or(0)
    }

    /// Number of entitlement rows (for tests and debugging).
    pub async fn entitlement_count(&self) -> usize {
        self.entitlements.read().await.len()
    }

    /// Number of stored messages across all subjects (for tests and
    /// debugging).
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Drops all rows.
    pub async fn clear(&self) {
        self.entitlements.write().await.clear();
        self.counters.write().await.clear();
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn find_entitlement(
        &self,
        subject_id: &str,
    ) -> Result<Option<EntitlementRecord>, StoreError> {
        let entitlements = self.entitlements.read().await;
        Ok(entitlements.get(subject_id).cloned())
    }

    async fn upsert_entitlement(
        &self,
        update: EntitlementUpdate,
    ) -> Result<EntitlementRecord, StoreError> {
        let mut entitlements = self.entitlements.write().await;
        let existing = entitlements.get(&update.subject_id);
        let record = EntitlementRecord {
            subject_id: update.subject_id.clone(),
            email: update.email,
            plan: update.plan,
            processor_customer_id: update
                .processor_customer_id
                .or_else(|| existing.and_then(|e| e.processor_customer_id.clone())),
            processor_subscription_id: update
                .processor_subscription_id
                .or_else(|| existing.and_then(|e| e.processor_subscription_id.clone())),
            updated_at: Utc::now(),
        };
        entitlements.insert(update.subject_id, record.clone());
        Ok(record)
    }

    async fn usage_count(&self, subject_id: &str, period: &str) -> Result<i64, StoreError> {
        let counters = self.counters.read().await;
        Ok(counters
            .get(&(subject_id.to_string(), period.to_string()))
            .map(|counter| counter.count)
            .unwrap_or(0))
    }

    async fn increment_usage(
        &self,
        subject_id: &str,
        period: &str,
        ceiling: i64,
    ) -> Result<IncrementOutcome, StoreError> {
        // Check and increment under one write lock; concurrent calls for
        // the same key serialize here.
        let mut counters = self.counters.write().await;
        let key = (subject_id.to_string(), period.to_string());
        match counters.get_mut(&key) {
            Some(counter) => {
                if counter.count >= ceiling {
                    Ok(IncrementOutcome::LimitReached {
                        count: counter.count,
                    })
                } else {
                    counter.count += 1;
                    counter.updated_at = Utc::now();
                    Ok(IncrementOutcome::Admitted {
                        count: counter.count,
                    })
                }
            }
            None => {
                if ceiling < 1 {
                    return Ok(IncrementOutcome::LimitReached { count: 0 });
                }
                counters.insert(
                    key,
                    UsageCounter {
                        subject_id: subject_id.to_string(),
                        period: period.to_string(),
                        count: 1,
                        updated_at: Utc::now(),
                    },
                );
                Ok(IncrementOutcome::Admitted { count: 1 })
            }
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append_message(
        &self,
        subject_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Message, StoreError> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: Utc::now(),
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn recent_messages(
        &self,
        subject_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        // Insertion order is chronological; reverse iteration yields
        // newest first even when timestamps tie.
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .rev()
            .filter(|message| message.subject_id == subject_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fisca_core::model::Plan;

    fn update(subject_id: &str, plan: Plan) -> EntitlementUpdate {
        EntitlementUpdate {
            subject_id: subject_id.to_string(),
            email: format!("{subject_id}@example.fr"),
            plan,
            processor_customer_id: None,
            processor_subscription_id: None,
        }
    }

    #[tokio::test]
    async fn find_missing_entitlement_returns_none() {
        let store = MemoryStore::new();
        let found = store.find_entitlement("nobody").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_in_place() {
        let store = MemoryStore::new();

        let created = store.upsert_entitlement(update("u1", Plan::Free)).await.unwrap();
        assert_eq!(created.plan, Plan::Free);
        assert_eq!(store.entitlement_count().await, 1);

        let updated = store.upsert_entitlement(update("u1", Plan::Pro)).await.unwrap();
        assert_eq!(updated.plan, Plan::Pro);
        assert_eq!(store.entitlement_count().await, 1);
    }

    #[tokio::test]
    async fn upsert_keeps_processor_ids_when_update_carries_none() {
        let store = MemoryStore::new();

        let mut first = update("u1", Plan::Pro);
        first.processor_customer_id = Some("cus_123".to_string());
        first.processor_subscription_id = Some("sub_456".to_string());
        store.upsert_entitlement(first).await.unwrap();

        let downgraded = store.upsert_entitlement(update("u1", Plan::Free)).await.unwrap();
        assert_eq!(downgraded.plan, Plan::Free);
        assert_eq!(downgraded.processor_customer_id.as_deref(), Some("cus_123"));
        assert_eq!(
            downgraded.processor_subscription_id.as_deref(),
            Some("sub_456")
        );
    }

    #[tokio::test]
    async fn usage_count_defaults_to_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.usage_count("u1", "2024-06").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn increment_walks_to_the_ceiling_then_denies() {
        let store = MemoryStore::new();

        for expected in 1..=5 {
            let outcome = store.increment_usage("u1", "2024-06", 5).await.unwrap();
            assert_eq!(outcome, IncrementOutcome::Admitted { count: expected });
        }

        let denied = store.increment_usage("u1", "2024-06", 5).await.unwrap();
        assert_eq!(denied, IncrementOutcome::LimitReached { count: 5 });
        assert_eq!(store.counter_value("u1", "2024-06").await, 5);
    }

    #[tokio::test]
    async fn increments_are_isolated_per_period() {
        let store = MemoryStore::new();

        for _ in 0..5 {
            store.increment_usage("u1", "2024-01", 5).await.unwrap();
        }
        assert_eq!(
            store.increment_usage("u1", "2024-01", 5).await.unwrap(),
            IncrementOutcome::LimitReached { count: 5 }
        );

        // A new period starts from zero and the old row is untouched.
        assert_eq!(
            store.increment_usage("u1", "2024-02", 5).await.unwrap(),
            IncrementOutcome::Admitted { count: 1 }
        );
        assert_eq!(store.counter_value("u1", "2024-01").await, 5);
        assert_eq!(store.counter_value("u1", "2024-02").await, 1);
    }

    #[tokio::test]
    async fn increments_are_isolated_per_subject() {
        let store = MemoryStore::new();

        store.increment_usage("u1", "2024-06", 5).await.unwrap();
        store.increment_usage("u2", "2024-06", 5).await.unwrap();

        assert_eq!(store.counter_value("u1", "2024-06").await, 1);
        assert_eq!(store.counter_value("u2", "2024-06").await, 1);
    }

    #[tokio::test]
    async fn concurrent_increments_admit_exactly_the_ceiling() {
        let store = MemoryStore::new();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_usage("u1", "2024-06", 5).await.unwrap()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if let IncrementOutcome::Admitted { .. } = handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(store.counter_value("u1", "2024-06").await, 5);
    }

    #[tokio::test]
    async fn append_then_recent_returns_newest_first() {
        let store = MemoryStore::new();

        store.append_message("u1", "q1", "a1").await.unwrap();
        store.append_message("u1", "q2", "a2").await.unwrap();
        store.append_message("u2", "other", "answer").await.unwrap();
        store.append_message("u1", "q3", "a3").await.unwrap();

        let recent = store.recent_messages("u1", 10).await.unwrap();
        let questions: Vec<&str> = recent.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(questions, vec!["q3", "q2", "q1"]);
        assert!(recent.iter().all(|m| m.subject_id == "u1"));
    }

    #[tokio::test]
    async fn recent_respects_the_limit() {
        let store = MemoryStore::new();

        for i in 0..15 {
            store
                .append_message("u1", &format!("q{i}"), "a")
                .await
                .unwrap();
        }

        let recent = store.recent_messages("u1", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].question, "q14");
        assert_eq!(recent[9].question, "q5");
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let store = MemoryStore::new();
        store.upsert_entitlement(update("u1", Plan::Pro)).await.unwrap();
        store.increment_usage("u1", "2024-06", 5).await.unwrap();
        store.append_message("u1", "q", "a").await.unwrap();

        store.clear().await;

        assert_eq!(store.entitlement_count().await, 0);
        assert_eq!(store.counter_value("u1", "2024-06").await, 0);
        assert_eq!(store.message_count().await, 0);
    }
}
