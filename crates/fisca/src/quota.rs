// Quota engine — plan-aware monthly admission control.
//
// The single quota authority in the system: it reads plans, advances
// per-period counters, and never writes plans. Counter accounting keys on
// authenticated subject ids only.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use fisca_core::model::{period_key, Allowance, Plan, UsageSnapshot};
use fisca_core::store::{EntitlementStore, IncrementOutcome, StoreError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum QuotaError {
    /// The free-tier ceiling is reached for the current period. Carries
    /// the snapshot the denial response must include.
    #[error("monthly question limit reached")]
    Exceeded(UsageSnapshot),
    /// The store failed mid-check. Never to be read as an admission.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct QuotaEngine {
    store: Arc<dyn EntitlementStore>,
    free_limit: i64,
}

impl QuotaEngine {
    pub fn new(store: Arc<dyn EntitlementStore>, free_limit: i64) -> Self {
        Self { store, free_limit }
    }

    /// Current plan for a subject. A missing entitlement record is free.
    pub async fn plan(&self, subject_id: &str) -> Result<Plan, StoreError> {
        Ok(self
            .store
            .find_entitlement(subject_id)
            .await?
            .map(|record| record.plan)
            .unwrap_or_default())
    }

    /// Decides admission for one request and, for free-plan callers,
    /// consumes one unit of quota.
    pub async fn check_and_consume(&self, subject_id: &str) -> Result<UsageSnapshot, QuotaError> {
        self.check_and_consume_at(subject_id, Utc::now()).await
    }

    /// Clock-explicit variant backing [`check_and_consume`]. The period is
    /// derived from `now`, never from anything client-supplied.
    pub async fn check_and_consume_at(
        &self,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, QuotaError> {
        // 1. Plan is read fresh on every call, so an upgrade applies to
        //    the very next request.
        let plan = self.plan(subject_id).await?;

        // 2. Pro admits unconditionally, with no counter traffic.
        if plan == Plan::Pro {
            return Ok(UsageSnapshot {
                count: 0,
                limit: Allowance::Unlimited,
                remaining: Allowance::Unlimited,
                plan,
                period: period_key(now),
            });
        }

        // 3. Free: consult the period counter first so an exhausted caller
        //    is denied without a write. A missing row reads as 0.
        let period = period_key(now);
        let count = self.store.usage_count(subject_id, &period).await?;
        if count >= self.free_limit {
            return Err(QuotaError::Exceeded(self.free_snapshot(count, &period)));
        }

        // 4. Advance atomically. A concurrent winner may still take the
        //    last unit between the read and this call; that is a denial
        //    too, with nothing written.
        match self
            .store
            .increment_usage(subject_id, &period, self.free_limit)
            .await?
        {
            IncrementOutcome::Admitted { count } => Ok(self.free_snapshot(count, &period)),
            IncrementOutcome::LimitReached { count } => {
                Err(QuotaError::Exceeded(self.free_snapshot(count, &period)))
            }
        }
    }

    fn free_snapshot(&self, count: i64, period: &str) -> UsageSnapshot {
        UsageSnapshot {
            count,
            limit: Allowance::Limited(self.free_limit),
            remaining: Allowance::Limited((self.free_limit - count).max(0)),
            plan: Plan::Free,
            period: period.to_string(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
