//! Application State

use std::sync::Arc;

use boost_payments::{PaymentError, Result, SeoGenerator, SessionIssuer, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Stripe integration (optional - None if not configured)
    pub payments: Option<Payments>,

    /// robots.txt / sitemap.xml rendering
    pub seo: Arc<SeoGenerator>,
}

/// Stripe-backed entry points, present only when Stripe is configured
#[derive(Clone)]
pub struct Payments {
    pub issuer: Arc<SessionIssuer>,
    pub webhooks: Arc<WebhookHandler>,
}

impl AppState {
    pub fn payments(&self) -> Result<&Payments> {
        self.payments
            .as_ref()
            .ok_or_else(|| PaymentError::Unconfigured("Stripe".into()))
    }
}
