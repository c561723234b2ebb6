//! Billing Events
//!
//! Typed view of a verified webhook body. Only fields this service acts on
//! are read; everything else in Stripe's schema is ignored.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{PaymentError, Result};

/// Stripe event envelope
#[derive(Clone, Debug, Deserialize)]
pub struct EventEnvelope {
    /// Event id (`evt_...`)
    pub id: String,

    /// Event type, e.g. `customer.subscription.updated`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Creation time (unix seconds)
    #[serde(default)]
    pub created: i64,

    pub data: EventData,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Subscription status as reported by Stripe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Whether an account with this status keeps the boost
    pub fn grants_entitlement(self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BillingEvent {
    /// Checkout finished; links the account to its customer and subscription
    CheckoutCompleted {
        account_id: Option<String>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },

    /// A subscription invoice was paid
    InvoicePaymentSucceeded { subscription_id: Option<String> },

    /// Subscription status changed
    SubscriptionUpdated {
        subscription_id: String,
        status: SubscriptionStatus,
    },

    /// Subscription ended
    SubscriptionDeleted { subscription_id: String },

    /// Event type this service does not act on
    Ignored { event_type: String },
}

impl BillingEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::CheckoutCompleted { .. } => "checkout_completed",
            BillingEvent::InvoicePaymentSucceeded { .. } => "invoice_payment_succeeded",
            BillingEvent::SubscriptionUpdated { .. } => "subscription_updated",
            BillingEvent::SubscriptionDeleted { .. } => "subscription_deleted",
            BillingEvent::Ignored { .. } => "ignored",
        }
    }
}

/// Either a bare id or an expanded object carrying one
#[derive(Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Deserialize)]
struct CheckoutSessionObject {
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    customer: Option<Expandable>,
    subscription: Option<Expandable>,
}

#[derive(Deserialize)]
struct InvoiceObject {
    subscription: Option<Expandable>,
    parent: Option<InvoiceParent>,
}

#[derive(Deserialize)]
struct InvoiceParent {
    subscription_details: Option<SubscriptionDetails>,
}

#[derive(Deserialize)]
struct SubscriptionDetails {
    subscription: Option<Expandable>,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: String,
    status: SubscriptionStatus,
}

impl EventEnvelope {
    /// Parse a verified webhook body
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| malformed(&e))
    }

    /// Map this envelope to the event the entitlement mapper understands
    pub fn decode(&self) -> Result<BillingEvent> {
        let object = &self.data.object;

        match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = from_object(object)?;
                let account_id = session
                    .client_reference_id
                    .filter(|id| !id.is_empty())
                    .or_else(|| session.metadata.get("user_id").cloned())
                    .filter(|id| !id.is_empty());

                Ok(BillingEvent::CheckoutCompleted {
                    account_id,
                    customer_id: session.customer.map(Expandable::into_id),
                    subscription_id: session.subscription.map(Expandable::into_id),
                })
            }

            "invoice.payment_succeeded" => {
                let invoice: InvoiceObject = from_object(object)?;
                let subscription_id = invoice.subscription.or_else(|| {
                    invoice
                        .parent
                        .and_then(|p| p.subscription_details)
                        .and_then(|d| d.subscription)
                });

                Ok(BillingEvent::InvoicePaymentSucceeded {
                    subscription_id: subscription_id.map(Expandable::into_id),
                })
            }

            "customer.subscription.updated" => {
                let sub: SubscriptionObject = from_object(object)?;
                Ok(BillingEvent::SubscriptionUpdated {
                    subscription_id: sub.id,
                    status: sub.status,
                })
            }

            "customer.subscription.deleted" => {
                let sub: SubscriptionObject = from_object(object)?;
                Ok(BillingEvent::SubscriptionDeleted {
                    subscription_id: sub.id,
                })
            }

            other => Ok(BillingEvent::Ignored {
                event_type: other.to_string(),
            }),
        }
    }
}

fn from_object<T: serde::de::DeserializeOwned>(object: &serde_json::Value) -> Result<T> {
    T::deserialize(object).map_err(|e| malformed(&e))
}

fn malformed(err: &serde_json::Error) -> PaymentError {
    PaymentError::SignatureInvalid(format!("malformed payload: {err}"))
}
