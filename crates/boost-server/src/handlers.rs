//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use boost_payments::{PaymentError, PlanPrice, SIGNATURE_HEADER};

use crate::state::AppState;

const SEO_CACHE_CONTROL: &str = "public, max-age=3600";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

type ApiResult<T> = Result<T, PaymentError>;

fn body_or_invalid<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PaymentError::InvalidRequest(rejection.body_text()))
}

fn log_failure(operation: &str, err: &PaymentError) {
    if err.is_retryable() {
        tracing::error!(error = %err, "{operation} failed");
    } else {
        tracing::warn!(error = %err, "{operation} rejected");
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness
pub async fn root() -> &'static str {
    "boost-billing is running"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.payments.is_some(),
    })
}

/// Configured plan price
pub async fn plan_price(State(state): State<AppState>) -> ApiResult<Json<PlanPrice>> {
    let price = state
        .payments()?
        .issuer
        .plan_price()
        .await
        .inspect_err(|e| log_failure("Price lookup", e))?;

    Ok(Json(price))
}

/// Create Stripe checkout session
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<SessionUrlResponse>> {
    let payments = state.payments()?;
    let request = body_or_invalid(payload)?;

    let url = payments
        .issuer
        .create_checkout_session(
            request.user_id.as_deref().unwrap_or_default(),
            request.email.as_deref(),
        )
        .await
        .inspect_err(|e| log_failure("Checkout", e))?;

    Ok(Json(SessionUrlResponse { url }))
}

/// Create Stripe customer portal session
pub async fn create_portal_session(
    State(state): State<AppState>,
    payload: Result<Json<PortalRequest>, JsonRejection>,
) -> ApiResult<Json<SessionUrlResponse>> {
    let payments = state.payments()?;
    let request = body_or_invalid(payload)?;

    let url = payments
        .issuer
        .create_portal_session(request.user_id.as_deref().unwrap_or_default())
        .await
        .inspect_err(|e| log_failure("Portal", e))?;

    Ok(Json(SessionUrlResponse { url }))
}

/// Stripe webhook handler
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let payments = state.payments()?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match payments.webhooks.handle(&body, signature).await {
        Ok(outcome) => {
            tracing::debug!(
                event_id = %outcome.event_id,
                kind = outcome.event.kind(),
                rows = outcome.rows_affected,
                "Webhook acknowledged"
            );
            Ok(Json(WebhookAck { received: true }))
        }
        Err(err) => {
            log_failure("Webhook", &err);
            Err(err)
        }
    }
}

pub async fn robots(State(state): State<AppState>) -> Response {
    cacheable("text/plain; charset=utf-8", state.seo.robots())
}

pub async fn sitemap(State(state): State<AppState>) -> ApiResult<Response> {
    let xml = state
        .seo
        .render_sitemap()
        .await
        .inspect_err(|e| log_failure("Sitemap", e))?;

    Ok(cacheable("application/xml; charset=utf-8", xml))
}

fn cacheable(content_type: &'static str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static(SEO_CACHE_CONTROL)),
        ],
        body,
    )
        .into_response()
}
