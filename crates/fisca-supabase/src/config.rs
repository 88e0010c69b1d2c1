//! Supabase project configuration.

use serde::{Deserialize, Serialize};

use fisca_core::error::FiscaError;

/// Connection settings for a Supabase project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL (`https://<ref>.supabase.co`).
    pub url: String,
    /// Public anon key, sent as `apikey` on every call.
    pub anon_key: String,
    /// Service role key for admin lookups. Falls back to the anon key
    /// when unset.
    #[serde(default)]
    pub service_role_key: Option<String>,
}

impl SupabaseConfig {
    /// Build a config from raw environment values, sanitizing the URL.
    pub fn new(
        url: &str,
        anon_key: &str,
        service_role_key: Option<String>,
    ) -> Result<Self, FiscaError> {
        Ok(Self {
            url: sanitize_url(url)?,
            anon_key: anon_key.trim().to_string(),
            service_role_key,
        })
    }

    /// Key used for admin endpoints.
    pub(crate) fn admin_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.anon_key)
    }
}

/// Normalize a project URL: trim whitespace, drop trailing slashes, and
/// refuse anything that does not parse as an https URL. A misspelled
/// project URL otherwise surfaces much later as opaque auth failures.
pub fn sanitize_url(raw: &str) -> Result<String, FiscaError> {
    let clean = raw.trim().trim_end_matches('/');
    if !clean.starts_with("https://") {
        return Err(FiscaError::Config(format!(
            "SUPABASE_URL must start with https:// (got {clean:?})"
        )));
    }
    url::Url::parse(clean)
        .map_err(|err| FiscaError::Config(format!("SUPABASE_URL is not a valid URL: {err}")))?;
    Ok(clean.to_string())
}
