//! # boost-payments
//!
//! Stripe billing for the boost entitlement.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  checkout   ┌─────────────────┐  webhook   ┌──────────────┐
//! │  Frontend   │────────────▶│  Stripe Hosted  │───────────▶│  /webhook    │
//! │  (userId)   │             │  Checkout Page  │            │  (this crate)│
//! └─────────────┘             └─────────────────┘            └──────┬───────┘
//!                                                                   │
//!                                                          ┌────────▼───────┐
//!                                                          │ accounts table │
//!                                                          │  is_boosted    │
//!                                                          └────────────────┘
//! ```
//!
//! The [`SessionIssuer`] hands out hosted checkout and portal URLs. Stripe
//! later reports what happened through signed webhook deliveries, which the
//! [`WebhookHandler`] verifies and turns into account updates. The two sides
//! never call each other; they meet on the account id Stripe carries in the
//! session's `client_reference_id`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use boost_payments::{
//!     PostgrestAccountStore, SessionIssuer, StoreConfig, StripeProcessor,
//!     WebhookHandler, WebhookVerifier,
//! };
//!
//! let accounts = Arc::new(PostgrestAccountStore::new(&StoreConfig::from_env()?)?);
//! let issuer = SessionIssuer::new(
//!     Arc::new(StripeProcessor::new("sk_test_xxx")),
//!     accounts.clone(),
//!     "price_xxx",
//!     "https://app.example.com",
//! );
//!
//! // Redirect the user to this URL
//! let url = issuer.create_checkout_session("user-123", None).await?;
//!
//! // Later, on POST /webhook
//! let webhooks = WebhookHandler::new(accounts, WebhookVerifier::new("whsec_xxx"));
//! webhooks.handle(&raw_body, Some(signature)).await?;
//! ```

mod account;
mod checkout;
mod config;
mod error;
mod event;
mod postgrest;
mod processor;
mod seo;
mod signature;
mod webhook;

pub use account::{Account, AccountStore, AccountUpdate, MemoryAccountStore};
pub use checkout::SessionIssuer;
pub use config::{StoreConfig, StripeConfig, optional, required};
pub use error::{PaymentError, Result};
pub use event::{BillingEvent, EventEnvelope, SubscriptionStatus};
pub use postgrest::PostgrestAccountStore;
pub use processor::{CheckoutSessionRequest, PaymentProcessor, PlanPrice, StripeProcessor};
pub use seo::{SeoGenerator, robots_txt, sitemap_xml};
pub use signature::{SIGNATURE_HEADER, SignatureHeader, WebhookVerifier, sign_payload};
pub use webhook::{WebhookHandler, WebhookOutcome};
