//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    create_checkout_session, create_portal_session, health_check, plan_price, robots, root,
    sitemap, stripe_webhook,
};
use crate::state::AppState;

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        // Health & info
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/price", get(plan_price))
        // Payments
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/create-portal-session", post(create_portal_session))
        .route("/webhook", post(stripe_webhook))
        // SEO
        .route("/robots.txt", get(robots))
        .route("/sitemap.xml", get(sitemap))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
