//! Stripe Webhook Handling
//!
//! Verifies deliveries, decodes them and applies the entitlement change each
//! event implies. Every transition is a flat assignment keyed by a stable
//! Stripe or account id, so redelivery of the same event is harmless.
//!
//! Deliveries are applied in arrival order. Nothing compares event
//! timestamps, so two `customer.subscription.updated` events delivered out of
//! order leave the older status in place.

use std::sync::Arc;

use crate::account::{AccountStore, AccountUpdate};
use crate::error::{PaymentError, Result};
use crate::event::{BillingEvent, EventEnvelope};
use crate::signature::WebhookVerifier;

/// Result of handling one delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub event_id: String,
    pub event: BillingEvent,
    pub rows_affected: u64,
}

/// Webhook handler
pub struct WebhookHandler {
    accounts: Arc<dyn AccountStore>,
    verifier: WebhookVerifier,
}

impl WebhookHandler {
    pub fn new(accounts: Arc<dyn AccountStore>, verifier: WebhookVerifier) -> Self {
        Self { accounts, verifier }
    }

    /// Verify, decode and apply one delivery
    ///
    /// No event is decoded before the signature check passes. Storage errors
    /// propagate so the delivery is answered with a failure and redelivered.
    pub async fn handle(&self, raw_body: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        let signature = signature
            .ok_or_else(|| PaymentError::SignatureInvalid("missing signature header".into()))?;
        self.verifier.verify(raw_body, signature)?;

        let envelope = EventEnvelope::from_slice(raw_body)?;
        let event = envelope.decode()?;

        tracing::info!(
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            created = envelope.created,
            "Processing Stripe webhook"
        );

        let rows_affected = self.apply(&event).await?;

        Ok(WebhookOutcome {
            event_id: envelope.id,
            event,
            rows_affected,
        })
    }

    /// Apply the transition for an already verified event
    pub async fn apply(&self, event: &BillingEvent) -> Result<u64> {
        match event {
            BillingEvent::CheckoutCompleted {
                account_id,
                customer_id,
                subscription_id,
            } => {
                let Some(account_id) = account_id else {
                    tracing::warn!(
                        customer_id = ?customer_id,
                        subscription_id = ?subscription_id,
                        "Checkout completed without an account reference"
                    );
                    return Ok(0);
                };

                let update = AccountUpdate {
                    customer_id: customer_id.clone(),
                    subscription_id: subscription_id.clone(),
                    boosted: Some(true),
                };
                let rows = self.accounts.update_by_id(account_id, &update).await?;

                tracing::info!(
                    account_id = %account_id,
                    subscription_id = ?subscription_id,
                    rows,
                    "Boost granted after checkout"
                );
                Ok(rows)
            }

            BillingEvent::InvoicePaymentSucceeded { subscription_id } => {
                let Some(subscription_id) = subscription_id else {
                    tracing::debug!("Paid invoice without a subscription");
                    return Ok(0);
                };

                let rows = self
                    .accounts
                    .update_by_subscription(subscription_id, &AccountUpdate::boosted(true))
                    .await?;

                tracing::info!(subscription_id = %subscription_id, rows, "Invoice paid");
                Ok(rows)
            }

            BillingEvent::SubscriptionUpdated {
                subscription_id,
                status,
            } => {
                let boosted = status.grants_entitlement();
                let update = AccountUpdate {
                    subscription_id: Some(subscription_id.clone()),
                    boosted: Some(boosted),
                    ..Default::default()
                };
                let rows = self
                    .accounts
                    .update_by_subscription(subscription_id, &update)
                    .await?;

                tracing::info!(
                    subscription_id = %subscription_id,
                    status = ?status,
                    boosted,
                    rows,
                    "Subscription updated"
                );
                Ok(rows)
            }

            BillingEvent::SubscriptionDeleted { subscription_id } => {
                let rows = self
                    .accounts
                    .update_by_subscription(subscription_id, &AccountUpdate::boosted(false))
                    .await?;

                tracing::info!(subscription_id = %subscription_id, rows, "Boost revoked");
                Ok(rows)
            }

            BillingEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(0)
            }
        }
    }
}
