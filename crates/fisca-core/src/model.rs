use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Wire label for an unbounded allowance, kept in the original French.
pub const UNLIMITED_LABEL: &str = "illimité";

// ─── Plan ────────────────────────────────────────────────────────

/// Entitlement tier. Gates whether the monthly quota applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    /// Lenient parse: anything that is not literally `pro` is free,
    /// matching how plan columns are read back from storage.
    pub fn parse(value: &str) -> Plan {
        match value {
            "pro" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Entitlements ────────────────────────────────────────────────

/// Durable record of one identity's subscription state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub subject_id: String,
    pub email: String,
    pub plan: Plan,
    pub processor_customer_id: Option<String>,
    pub processor_subscription_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Write request for an entitlement row. Processor ids overwrite the
/// stored values only when set, so a plan-only transition keeps them.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementUpdate {
    pub subject_id: String,
    pub email: String,
    pub plan: Plan,
    pub processor_customer_id: Option<String>,
    pub processor_subscription_id: Option<String>,
}

/// Per-period request counter for a free-plan identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub subject_id: String,
    pub period: String,
    pub count: i64,
    pub updated_at: DateTime<Utc>,
}

// ─── Conversation history ────────────────────────────────────────

/// One question/answer pair. Append-only, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "user_id")]
    pub subject_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

// ─── Usage reporting ─────────────────────────────────────────────

/// A limit or remaining balance as rendered on the wire: a number for
/// free-plan callers, `"illimité"` for pro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    Limited(i64),
    Unlimited,
}

impl Serialize for Allowance {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Allowance::Limited(n) => serializer.serialize_i64(*n),
            Allowance::Unlimited => serializer.serialize_str(UNLIMITED_LABEL),
        }
    }
}

impl std::fmt::Display for Allowance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Allowance::Limited(n) => write!(f, "{n}"),
            Allowance::Unlimited => write!(f, "{UNLIMITED_LABEL}"),
        }
    }
}

/// Usage state reported alongside admissions and quota denials, complete
/// enough for a client to render "X/5 used" without a second call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub count: i64,
    pub limit: Allowance,
    pub remaining: Allowance,
    pub plan: Plan,
    #[serde(rename = "ym")]
    pub period: String,
}

/// Calendar-month key (`YYYY-MM`) bucketing usage counters. Derived from
/// server wall clock at check time, never from client input.
pub fn period_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn period_key_pads_single_digit_months() {
        let march = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(period_key(march), "2024-03");

        let december = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(period_key(december), "2025-12");
    }

    #[test]
    fn plan_parse_is_lenient() {
        assert_eq!(Plan::parse("pro"), Plan::Pro);
        assert_eq!(Plan::parse("free"), Plan::Free);
        assert_eq!(Plan::parse("enterprise"), Plan::Free);
        assert_eq!(Plan::parse(""), Plan::Free);
    }

    #[test]
    fn plan_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Plan::Pro).unwrap(), "\"pro\"");
        assert_eq!(serde_json::to_string(&Plan::Free).unwrap(), "\"free\"");
    }

    #[test]
    fn allowance_serializes_number_or_label() {
        assert_eq!(serde_json::to_string(&Allowance::Limited(4)).unwrap(), "4");
        assert_eq!(
            serde_json::to_string(&Allowance::Unlimited).unwrap(),
            "\"illimité\""
        );
    }

    #[test]
    fn snapshot_wire_shape_uses_ym_key() {
        let snapshot = UsageSnapshot {
            count: 1,
            limit: Allowance::Limited(5),
            remaining: Allowance::Limited(4),
            plan: Plan::Free,
            period: "2024-06".to_string(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["limit"], 5);
        assert_eq!(json["remaining"], 4);
        assert_eq!(json["plan"], "free");
        assert_eq!(json["ym"], "2024-06");
    }

    #[test]
    fn message_serializes_subject_as_user_id() {
        let message = Message {
            id: "m1".to_string(),
            subject_id: "u1".to_string(),
            question: "q".to_string(),
            answer: "a".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert!(json.get("subject_id").is_none());
    }
}
