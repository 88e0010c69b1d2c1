// Health route.

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Unix milliseconds.
    pub ts: i64,
}

pub fn handle_health() -> HealthResponse {
    HealthResponse {
        ok: true,
        ts: Utc::now().timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_ok_with_a_millisecond_timestamp() {
        let before = Utc::now().timestamp_millis();
        let response = handle_health();
        let after = Utc::now().timestamp_millis();

        assert!(response.ok);
        assert!(response.ts >= before && response.ts <= after);
    }
}
