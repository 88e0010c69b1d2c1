use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("completion service unavailable: {0}")]
    Unavailable(String),
    #[error("completion service rejected the request: {0}")]
    Rejected(String),
    #[error("completion response malformed: {0}")]
    Malformed(String),
}

/// Hosted answer generator. Stateless between calls.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn generate(&self, question: &str) -> Result<String, CompletionError>;
}
