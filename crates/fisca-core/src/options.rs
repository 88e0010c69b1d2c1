use serde::{Deserialize, Serialize};

use crate::error::FiscaError;

/// Top-level service configuration.
///
/// Every external collaborator is optional at this layer; the binary
/// decides which absences degrade a capability and which fail startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscaOptions {
    /// Externally reachable base URL used to build redirect targets.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Monthly ceiling for free-plan callers.
    #[serde(default = "default_free_question_limit")]
    pub free_question_limit: i64,

    /// Absent means no persistence: no history, no quota, admit-always.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default)]
    pub identity: IdentityOptions,

    #[serde(default)]
    pub completion: CompletionOptions,

    #[serde(default)]
    pub billing: BillingOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    /// Directory-level key; lookups fall back to the anon key without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_completion_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

fn default_app_base_url() -> String {
    "http://localhost:3010".to_string()
}

fn default_port() -> u16 {
    3010
}

fn default_free_question_limit() -> i64 {
    5
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_completion_temperature() -> f32 {
    0.2
}

impl Default for FiscaOptions {
    fn default() -> Self {
        Self {
            app_base_url: default_app_base_url(),
            port: default_port(),
            free_question_limit: default_free_question_limit(),
            database_url: None,
            identity: IdentityOptions::default(),
            completion: CompletionOptions::default(),
            billing: BillingOptions::default(),
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_completion_model(),
            temperature: default_completion_temperature(),
        }
    }
}

impl FiscaOptions {
    /// Builds options from process environment variables. Unset and empty
    /// variables both count as absent.
    pub fn from_env() -> Result<Self, FiscaError> {
        let port = match env_opt("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| FiscaError::Config(format!("invalid PORT value: {raw}")))?,
            None => default_port(),
        };

        let free_question_limit = match env_opt("FREE_QUESTION_LIMIT") {
            Some(raw) => {
                let parsed = raw.parse::<i64>().map_err(|_| {
                    FiscaError::Config(format!("invalid FREE_QUESTION_LIMIT value: {raw}"))
                })?;
                if parsed < 1 {
                    return Err(FiscaError::Config(format!(
                        "FREE_QUESTION_LIMIT must be at least 1, got {parsed}"
                    )));
                }
                parsed
            }
            None => default_free_question_limit(),
        };

        Ok(Self {
            app_base_url: env_opt("APP_BASE_URL").unwrap_or_else(default_app_base_url),
            port,
            free_question_limit,
            database_url: env_opt("DATABASE_URL"),
            identity: IdentityOptions {
                url: env_opt("SUPABASE_URL"),
                anon_key: env_opt("SUPABASE_ANON_KEY"),
                service_role_key: env_opt("SUPABASE_SERVICE_ROLE_KEY"),
            },
            completion: CompletionOptions {
                api_key: env_opt("OPENAI_API_KEY"),
                model: env_opt("OPENAI_MODEL").unwrap_or_else(default_completion_model),
                temperature: default_completion_temperature(),
            },
            billing: BillingOptions {
                secret_key: env_opt("STRIPE_SECRET_KEY"),
                price_id: env_opt("STRIPE_PRICE_ID"),
                webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
            },
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}
