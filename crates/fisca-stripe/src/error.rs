//! Stripe webhook error codes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeError {
    WebhookSignatureInvalid,
    WebhookPayloadInvalid,
}

impl StripeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::WebhookSignatureInvalid => "WEBHOOK_SIGNATURE_INVALID",
            Self::WebhookPayloadInvalid => "WEBHOOK_PAYLOAD_INVALID",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::WebhookSignatureInvalid => "Webhook signature verification failed",
            Self::WebhookPayloadInvalid => "Webhook payload could not be decoded",
        }
    }
}

impl std::fmt::Display for StripeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for StripeError {}
