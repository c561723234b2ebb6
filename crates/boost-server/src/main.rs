//! boost-billing HTTP Server
//!
//! Axum-based server issuing Stripe checkout/portal sessions, receiving
//! Stripe webhooks and serving the SEO artifacts.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boost_payments::{
    AccountStore, PostgrestAccountStore, SeoGenerator, SessionIssuer, StripeProcessor,
    WebhookHandler, WebhookVerifier,
};

use crate::config::ServerConfig;
use crate::routes::build_router;
use crate::state::{AppState, Payments};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Account store
    let accounts: Arc<dyn AccountStore> = Arc::new(
        PostgrestAccountStore::new(&config.store).context("failed to build account store")?,
    );
    tracing::info!(table = %config.store.table, "Account store configured");

    // Payments
    let payments = config.stripe.as_ref().map(|stripe| Payments {
        issuer: Arc::new(SessionIssuer::new(
            Arc::new(StripeProcessor::new(&stripe.secret_key)),
            accounts.clone(),
            stripe.price_id.clone(),
            config.public_base_url.clone(),
        )),
        webhooks: Arc::new(WebhookHandler::new(
            accounts.clone(),
            WebhookVerifier::new(stripe.webhook_secret.clone()),
        )),
    });

    if payments.is_some() {
        tracing::info!("Stripe configured");
    } else {
        tracing::warn!("Stripe not configured - payment endpoints answer 501");
        tracing::warn!("  Set STRIPE_SECRET_KEY, STRIPE_PRICE_ID and STRIPE_WEBHOOK_SECRET in .env");
    }

    // Build application state
    let state = AppState {
        seo: Arc::new(SeoGenerator::new(accounts, config.public_base_url.clone())),
        payments,
    };

    let cors = config
        .allowed_origins
        .cors_layer()
        .context("invalid CORS configuration")?;
    let app = build_router(state, cors);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("boost-billing listening on http://{}", addr);
    tracing::info!("  POST /create-checkout-session");
    tracing::info!("  POST /create-portal-session");
    tracing::info!("  POST /webhook");

    axum::serve(listener, app).await?;

    Ok(())
}
