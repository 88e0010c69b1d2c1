//! Chat-completion backend for the answer generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fisca_core::completion::{Completion, CompletionError};

use crate::config::OpenAiConfig;

/// Instructions framing every question. French tax/accounting scope,
/// stepwise calculations, polite refusal off topic.
pub const SYSTEM_PROMPT: &str = "
Tu es une aide fiscale/comptable pour la France. Réponds simplement et en français.
Quand tu fais un calcul (TVA, cotisations, IR), montre la formule et les étapes.
Si la question n'est pas fiscale/comptable FR, dis-le poliment.
";

/// Answer returned when the model produces no content.
pub const NO_ANSWER: &str = "Aucune réponse.";

#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    config: OpenAiConfig,
    http: reqwest::Client,
}

// ─── Wire payloads ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// First non-empty choice, or the fixed fallback.
fn answer_from(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| NO_ANSWER.to_string())
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            let message = value.get("error")?.get("message")?.as_str()?;
            Some(message.to_string())
        })
        .unwrap_or_else(|| body.to_string())
}

// ─── Client ────────────────────────────────────────────────────────

impl OpenAiCompletion {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn generate(&self, question: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| CompletionError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            return Err(if status.is_client_error() {
                CompletionError::Rejected(format!("{status}: {detail}"))
            } else {
                CompletionError::Unavailable(format!("{status}: {detail}"))
            });
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Malformed(err.to_string()))?;

        let answer = answer_from(payload);
        tracing::debug!(model = %self.config.model, chars = answer.len(), "completion generated");
        Ok(answer)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────
