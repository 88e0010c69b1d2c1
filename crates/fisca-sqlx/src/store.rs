// SqlxStore — entitlements, usage counters, and conversation history on
// sqlx::Any. Postgres and SQLite share one pool type here; $N placeholders
// and the ON CONFLICT syntax below work natively on both.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};

use fisca_core::model::{EntitlementRecord, EntitlementUpdate, Message, Plan};
use fisca_core::store::{ConversationStore, EntitlementStore, IncrementOutcome, StoreError};

/// Schema statements, idempotent by construction.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS entitlements (
        subject_id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        plan TEXT NOT NULL DEFAULT 'free',
        processor_customer_id TEXT,
        processor_subscription_id TEXT,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS usage_counters (
        subject_id TEXT NOT NULL,
        period TEXT NOT NULL,
        count BIGINT NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (subject_id, period)
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        subject_id TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_subject_created
        ON messages (subject_id, created_at)",
];

#[derive(Debug, Clone)]
pub struct SqlxStore {
    pool: AnyPool,
}

impl SqlxStore {
    /// Wrap an existing pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Connect to a database URL.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        // Each connection to a SQLite in-memory database is its own
        // database, so cap the pool at one connection there.
        let pool = if url.contains(":memory:") || url.contains("mode=memory") {
            sqlx::any::AnyPoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await
        } else {
            AnyPool::connect(url).await
        }
        .map_err(|err| StoreError::Unavailable(format!("database connection failed: {err}")))?;

        Ok(Self { pool })
    }

    /// Create missing tables and indexes. Safe to run on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|err| StoreError::Database(format!("migration failed: {err}")))?;
        }
        tracing::debug!("schema migrated");
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// Fixed-width UTC timestamp so lexical order in TEXT columns matches
/// chronological order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt(format!("bad timestamp {raw:?}: {err}")))
}

fn entitlement_from_row(row: &AnyRow) -> Result<EntitlementRecord, StoreError> {
    let plan: String = row.try_get("plan").map_err(db_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(db_err)?;
    Ok(EntitlementRecord {
        subject_id: row.try_get("subject_id").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        plan: Plan::parse(&plan),
        processor_customer_id: row.try_get("processor_customer_id").map_err(db_err)?,
        processor_subscription_id: row.try_get("processor_subscription_id").map_err(db_err)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn message_from_row(row: &AnyRow) -> Result<Message, StoreError> {
    let created_at: String = row.try_get("created_at").map_err(db_err)?;
    Ok(Message {
        id: row.try_get("id").map_err(db_err)?,
        subject_id: row.try_get("subject_id").map_err(db_err)?,
        question: row.try_get("question").map_err(db_err)?,
        answer: row.try_get("answer").map_err(db_err)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl EntitlementStore for SqlxStore {
    async fn find_entitlement(
        &self,
        subject_id: &str,
    ) -> Result<Option<EntitlementRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT subject_id, email, plan, processor_customer_id, \
             processor_subscription_id, updated_at \
             FROM entitlements WHERE subject_id = $1",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(entitlement_from_row).transpose()
    }

    async fn upsert_entitlement(
        &self,
        update: EntitlementUpdate,
    ) -> Result<EntitlementRecord, StoreError> {
        // COALESCE keeps stored processor ids when the update carries none.
        sqlx::query(
            "INSERT INTO entitlements \
             (subject_id, email, plan, processor_customer_id, processor_subscription_id, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT(subject_id) DO UPDATE SET \
                 email = excluded.email, \
                 plan = excluded.plan, \
                 processor_customer_id = \
                     COALESCE(excluded.processor_customer_id, entitlements.processor_customer_id), \
                 processor_subscription_id = \
                     COALESCE(excluded.processor_subscription_id, entitlements.processor_subscription_id), \
                 updated_at = excluded.updated_at",
        )
        .bind(&update.subject_id)
        .bind(&update.email)
        .bind(update.plan.as_str())
        .bind(&update.processor_customer_id)
        .bind(&update.processor_subscription_id)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.find_entitlement(&update.subject_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt("entitlement row missing after upsert".to_string()))
    }

    async fn usage_count(&self, subject_id: &str, period: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT count FROM usage_counters WHERE subject_id = $1 AND period = $2",
        )
        .bind(subject_id)
        .bind(period)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => row.try_get::<i64, _>("count").map_err(db_err),
            None => Ok(0),
        }
    }

    async fn increment_usage(
        &self,
        subject_id: &str,
        period: &str,
        ceiling: i64,
    ) -> Result<IncrementOutcome, StoreError> {
        if ceiling < 1 {
            return Ok(IncrementOutcome::LimitReached { count: 0 });
        }

        // Single-statement check-and-increment: when the DO UPDATE guard
        // fails the engine reports zero affected rows and nothing is
        // written.
        let result = sqlx::query(
            "INSERT INTO usage_counters (subject_id, period, count, updated_at) \
             VALUES ($1, $2, 1, $3) \
             ON CONFLICT(subject_id, period) DO UPDATE SET \
                 count = usage_counters.count + 1, \
                 updated_at = $3 \
             WHERE usage_counters.count < $4",
        )
        .bind(subject_id)
        .bind(period)
        .bind(format_timestamp(Utc::now()))
        .bind(ceiling)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let count = self.usage_count(subject_id, period).await?;
        if result.rows_affected() == 0 {
            Ok(IncrementOutcome::LimitReached { count })
        } else {
            Ok(IncrementOutcome::Admitted { count })
        }
    }
}

#[async_trait]
impl ConversationStore for SqlxStore {
    async fn append_message(
        &self,
        subject_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Message, StoreError> {
        // Round-trip the timestamp through its stored form so the returned
        // message equals what a later read yields.
        let stored_at = format_timestamp(Utc::now());
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: parse_timestamp(&stored_at)?,
        };

        sqlx::query(
            "INSERT INTO messages (id, subject_id, question, answer, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&message.id)
        .bind(&message.subject_id)
        .bind(&message.question)
        .bind(&message.answer)
        .bind(&stored_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(message)
    }

    async fn recent_messages(
        &self,
        subject_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, subject_id, question, answer, created_at \
             FROM messages WHERE subject_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
        )
        .bind(subject_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(message_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_and_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let late = early + chrono::Duration::microseconds(1);

        let a = format_timestamp(early);
        let b = format_timestamp(late);
        assert!(a < b);
        assert_eq!(parse_timestamp(&a).unwrap(), early);
    }

    #[test]
    fn parse_timestamp_flags_garbage_as_corrupt() {
        let err = parse_timestamp("not-a-date").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
