//! fisca-server — the deployable HTTP binary.
//!
//! Reads configuration from the environment, wires the live collaborators
//! (Supabase identity, OpenAI completion, Stripe billing, SQL persistence),
//! and serves the Axum router until ctrl-c or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use fisca::context::{Dependencies, Stores};
use fisca_axum::Fisca;
use fisca_core::billing::BillingProcessor;
use fisca_core::options::FiscaOptions;
use fisca_openai::{OpenAiCompletion, OpenAiConfig};
use fisca_sqlx::SqlxStore;
use fisca_stripe::{StripeClient, StripeConfig};
use fisca_supabase::{SupabaseConfig, SupabaseIdentity};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fisca_core::env::init_logger();

    let options = FiscaOptions::from_env().context("reading configuration")?;
    log_startup_config(&options);

    let deps = build_dependencies(&options).await?;
    let port = options.port;
    let app = Fisca::new(options, deps).router_with_cors();

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding 0.0.0.0:{port}"))?;
    info!(port, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("server stopped");
    Ok(())
}

/// Construct the live collaborators. Identity and completion are required;
/// billing and persistence degrade when unconfigured.
async fn build_dependencies(options: &FiscaOptions) -> anyhow::Result<Dependencies> {
    let identity = {
        let url = options
            .identity
            .url
            .as_deref()
            .context("SUPABASE_URL is required")?;
        let anon_key = options
            .identity
            .anon_key
            .as_deref()
            .context("SUPABASE_ANON_KEY is required")?;
        let config =
            SupabaseConfig::new(url, anon_key, options.identity.service_role_key.clone())?;
        Arc::new(SupabaseIdentity::new(config))
    };

    let completion = {
        let api_key = options
            .completion
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY is required")?;
        let config = OpenAiConfig::new(api_key)
            .with_model(options.completion.model.clone())
            .with_temperature(options.completion.temperature);
        Arc::new(OpenAiCompletion::new(config))
    };

    let billing: Option<Arc<dyn BillingProcessor>> = match &options.billing.secret_key {
        Some(secret_key) => {
            let mut config = StripeConfig::new(secret_key, &options.app_base_url);
            if let Some(price_id) = &options.billing.price_id {
                config = config.with_price_id(price_id);
            }
            Some(Arc::new(StripeClient::new(config)))
        }
        None => {
            warn!("STRIPE_SECRET_KEY not set; billing routes will answer unconfigured");
            None
        }
    };

    let stores = match &options.database_url {
        Some(url) => {
            let store = SqlxStore::connect(url)
                .await
                .context("connecting to DATABASE_URL")?;
            store.migrate().await.context("running migrations")?;
            info!("persistence ready");
            Some(Stores {
                entitlements: Arc::new(store.clone()),
                conversations: Arc::new(store),
            })
        }
        // AppContext logs the degraded-mode warning.
        None => None,
    };

    Ok(Dependencies {
        identity,
        completion,
        billing,
        stores,
    })
}

/// First characters of a sensitive value, never the whole thing.
fn preview(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{}...", value.chars().take(40).collect::<String>()),
        None => "unset".to_string(),
    }
}

// Startup visibility without leaking secrets: presence flags, a truncated
// URL, and a JWT shape check on the anon key.
fn log_startup_config(options: &FiscaOptions) {
    info!(
        port = options.port,
        app_base_url = %options.app_base_url,
        free_question_limit = options.free_question_limit,
        "configuration loaded"
    );
    info!(
        supabase_url = %preview(options.identity.url.as_deref()),
        anon_key_is_jwt = options
            .identity
            .anon_key
            .as_deref()
            .unwrap_or_default()
            .starts_with("eyJ"),
        service_role_key = options.identity.service_role_key.is_some(),
        "identity configuration"
    );
    info!(
        api_key = options.completion.api_key.is_some(),
        model = %options.completion.model,
        "completion configuration"
    );
    info!(
        secret_key = options.billing.secret_key.is_some(),
        price_id = options.billing.price_id.is_some(),
        webhook_secret = options.billing.webhook_secret.is_some(),
        "billing configuration"
    );
    info!(
        database_url = options.database_url.is_some(),
        "persistence configuration"
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
        info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
