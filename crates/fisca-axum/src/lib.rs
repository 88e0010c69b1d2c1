//! # fisca-axum
//!
//! Axum adapter for the fisca service: one thin wrapper per endpoint
//! that maps HTTP requests onto the framework-agnostic handlers in
//! [`fisca`] and their typed errors onto the service's French wire
//! contract (`{ok:false, error:…}` bodies).

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use fisca::context::{AppContext, Dependencies};
use fisca::routes;
use fisca_core::billing::BillingError;
use fisca_core::identity::{AuthenticatedUser, CallerIdentity, IdentityError};
use fisca_core::model::UsageSnapshot;
use fisca_core::options::FiscaOptions;

// ─── Error Handling ──────────────────────────────────────────────

/// API error with the HTTP status and the French user-facing message.
/// Quota denials additionally carry the usage snapshot their response
/// body must include.
struct ApiError {
    status: StatusCode,
    message: String,
    usage: Option<UsageSnapshot>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            usage: None,
        }
    }

    fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "non authentifié")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "ok": false,
            "error": self.message,
        });
        if let Some(usage) = &self.usage {
            body["usage"] = serde_json::json!(usage);
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<routes::ask::AskHandlerError> for ApiError {
    fn from(err: routes::ask::AskHandlerError) -> Self {
        use routes::ask::AskHandlerError;
        let message = err.user_message();
        match err {
            AskHandlerError::MissingQuestion => Self::new(StatusCode::BAD_REQUEST, message),
            AskHandlerError::QuotaExceeded(snapshot) => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                message,
                usage: Some(snapshot),
            },
            other => {
                tracing::error!(error = %other, "ask failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<routes::messages::MessagesHandlerError> for ApiError {
    fn from(err: routes::messages::MessagesHandlerError) -> Self {
        tracing::error!(error = %err, "history lookup failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.user_message())
    }
}

impl From<routes::signup::SignUpHandlerError> for ApiError {
    fn from(err: routes::signup::SignUpHandlerError) -> Self {
        use routes::signup::SignUpHandlerError;
        let message = err.user_message();
        match err {
            SignUpHandlerError::MissingCredentials
            | SignUpHandlerError::PasswordTooShort
            | SignUpHandlerError::Rejected(_) => Self::new(StatusCode::BAD_REQUEST, message),
            SignUpHandlerError::Identity(cause) => {
                tracing::error!(error = %cause, "sign-up failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<routes::signin::SignInHandlerError> for ApiError {
    fn from(err: routes::signin::SignInHandlerError) -> Self {
        use routes::signin::SignInHandlerError;
        let message = err.user_message();
        match err {
            SignInHandlerError::MissingCredentials => Self::new(StatusCode::BAD_REQUEST, message),
            SignInHandlerError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, message),
            SignInHandlerError::Identity(cause) => {
                tracing::error!(error = %cause, "sign-in failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<routes::signout::SignOutHandlerError> for ApiError {
    fn from(err: routes::signout::SignOutHandlerError) -> Self {
        let message = err.user_message();
        let routes::signout::SignOutHandlerError::Identity(cause) = &err;
        match cause {
            IdentityError::Rejected(_) => Self::new(StatusCode::BAD_REQUEST, message),
            _ => {
                tracing::error!(error = %err, "sign-out failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<routes::billing::CheckoutHandlerError> for ApiError {
    fn from(err: routes::billing::CheckoutHandlerError) -> Self {
        use routes::billing::CheckoutHandlerError;
        let message = err.user_message();
        match &err {
            CheckoutHandlerError::Billing(BillingError::NotConfigured) => {}
            _ => tracing::error!(error = %err, "checkout failed"),
        }
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<routes::billing::PortalHandlerError> for ApiError {
    fn from(err: routes::billing::PortalHandlerError) -> Self {
        use routes::billing::PortalHandlerError;
        let message = err.user_message();
        match &err {
            PortalHandlerError::NoCustomer => Self::new(StatusCode::NOT_FOUND, message),
            PortalHandlerError::Billing(BillingError::NotConfigured) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            PortalHandlerError::Billing(_) => {
                tracing::error!(error = %err, "portal failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

// ─── Caller Extraction ───────────────────────────────────────────

/// Extract the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Extract the client IP from proxy headers, for logging only.
fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or("unknown").trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// 401 for a request that carries no usable bearer token.
fn unauthenticated(headers: &HeaderMap) -> ApiError {
    let caller = CallerIdentity::Anonymous {
        network_address: extract_ip(headers),
    };
    tracing::debug!(caller = %caller, "request without bearer token");
    ApiError::unauthenticated()
}

/// Resolve the caller from a bearer token. Every verification failure
/// is the same 401 on the wire; provider outages go to the log.
async fn require_user(ctx: &AppContext, token: &str) -> Result<AuthenticatedUser, ApiError> {
    match ctx.identity.verify_token(token).await {
        Ok(user) => Ok(user),
        Err(IdentityError::InvalidToken) => Err(ApiError::unauthenticated()),
        Err(err) => {
            tracing::error!(error = %err, "token verification failed");
            Err(ApiError::unauthenticated())
        }
    }
}

/// Decode a JSON body, treating an absent or malformed body as empty
/// so field validation produces the route's own French 400.
fn lenient_json<T: serde::de::DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

// ─── Fisca Builder ───────────────────────────────────────────────

/// The entry point for serving fisca over Axum.
///
/// # Example
///
/// ```rust,ignore
/// use fisca_axum::Fisca;
/// use fisca_core::options::FiscaOptions;
///
/// let fisca = Fisca::new(FiscaOptions::default(), deps);
/// let app: axum::Router = fisca.router_with_cors();
/// ```
pub struct Fisca {
    ctx: Arc<AppContext>,
}

impl Fisca {
    /// Build the application context and the adapter in one step.
    pub fn new(options: FiscaOptions, deps: Dependencies) -> Self {
        Self {
            ctx: AppContext::new(options, deps),
        }
    }

    /// Wrap an existing context.
    pub fn from_context(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Build the Axum `Router` with every service endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            // Health
            .route("/health", get(handle_health))
            // Q&A
            .route("/api/ask", post(handle_ask))
            .route("/api/messages", get(handle_messages))
            // Auth
            .route("/auth/signup", post(handle_sign_up))
            .route("/auth/signin", post(handle_sign_in))
            .route("/auth/signout", post(handle_sign_out))
            .route("/auth/me", get(handle_me))
            // Billing
            .route(
                "/billing/create-checkout-session",
                post(handle_create_checkout),
            )
            .route("/billing/portal", get(handle_portal))
            .route("/webhooks/stripe", post(handle_stripe_webhook))
            .with_state(self.ctx.clone())
    }

    /// Build the router with permissive CORS for browser frontends.
    /// Layer your own `CorsLayer` over [`Fisca::router`] for anything
    /// stricter.
    pub fn router_with_cors(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        self.router().layer(cors)
    }
}

// ─── Route Handlers ──────────────────────────────────────────────

async fn handle_health() -> impl IntoResponse {
    Json(routes::health::handle_health())
}

async fn handle_ask(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| unauthenticated(&headers))?;
    let user = require_user(&ctx, &token).await?;

    let caller = CallerIdentity::Authenticated(user.clone());
    tracing::debug!(caller = %caller, ip = %extract_ip(&headers), "question received");

    let request: routes::ask::AskRequest = lenient_json(&body);
    let result = routes::ask::handle_ask(ctx, &user, request).await?;
    Ok(Json(result))
}

async fn handle_messages(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| unauthenticated(&headers))?;
    let user = require_user(&ctx, &token).await?;

    let result = routes::messages::handle_messages(ctx, &user).await?;
    Ok(Json(result))
}

async fn handle_sign_up(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: routes::signup::SignUpRequest = lenient_json(&body);
    let result = routes::signup::handle_sign_up(ctx, request).await?;
    Ok(Json(result))
}

async fn handle_sign_in(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: routes::signin::SignInRequest = lenient_json(&body);
    let result = routes::signin::handle_sign_in(ctx, request).await?;
    Ok(Json(result))
}

async fn handle_sign_out(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| unauthenticated(&headers))?;
    require_user(&ctx, &token).await?;

    let result = routes::signout::handle_sign_out(ctx, &token).await?;
    Ok(Json(result))
}

async fn handle_me(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| unauthenticated(&headers))?;
    let user = require_user(&ctx, &token).await?;

    Ok(Json(routes::me::handle_me(ctx, &user).await))
}

async fn handle_create_checkout(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| unauthenticated(&headers))?;
    let user = require_user(&ctx, &token).await?;

    let result = routes::billing::handle_create_checkout(ctx, &user).await?;
    Ok(Json(result))
}

async fn handle_portal(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| unauthenticated(&headers))?;
    let user = require_user(&ctx, &token).await?;

    let result = routes::billing::handle_portal(ctx, &user).await?;
    Ok(Json(result))
}

/// Processor webhook. The signature is always verified before the body
/// is read; once it checks out, the event is acknowledged no matter
/// what applying it does, so the processor never retries an event this
/// service has already seen. Application failures go to the log.
async fn handle_stripe_webhook(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Some(secret) = &ctx.options.billing.webhook_secret else {
        tracing::error!("webhook received but no webhook secret is configured");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook non configuré",
        ));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let event = fisca_stripe::webhook::construct_event(&body, signature, secret).map_err(|err| {
        tracing::warn!(error = %err, ip = %extract_ip(&headers), "webhook rejected");
        ApiError::new(StatusCode::BAD_REQUEST, "Signature invalide")
    })?;

    match fisca_stripe::webhook::to_billing_event(&event) {
        Ok(Some(billing_event)) => match &ctx.sync {
            Some(sync) => {
                if let Err(err) = sync.apply_event(billing_event).await {
                    tracing::error!(event = %event.event_type, error = %err, "billing event failed");
                }
            }
            None => {
                tracing::warn!(event = %event.event_type, "billing event dropped, no persistence");
            }
        },
        Ok(None) => {
            tracing::debug!(event = %event.event_type, "unhandled webhook event type");
        }
        Err(err) => {
            tracing::error!(event = %event.event_type, error = %err, "webhook object undecodable");
        }
    }

    Ok(Json(serde_json::json!({ "ok": true, "received": true })))
}

// ─── Tests ───────────────────────────────────────────────────────
