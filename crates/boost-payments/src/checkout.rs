//! Stripe Checkout Integration
//!
//! Issues hosted checkout and customer-portal sessions for an account. The
//! price always comes from configuration, never from the caller.

use std::sync::Arc;

use crate::account::{AccountStore, AccountUpdate};
use crate::error::{PaymentError, Result};
use crate::processor::{CheckoutSessionRequest, PaymentProcessor, PlanPrice};

/// Builds redirect URLs into Stripe-hosted pages
pub struct SessionIssuer {
    processor: Arc<dyn PaymentProcessor>,
    accounts: Arc<dyn AccountStore>,
    price_id: String,
    public_base_url: String,
}

impl SessionIssuer {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        accounts: Arc<dyn AccountStore>,
        price_id: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            accounts,
            price_id: price_id.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a checkout session for `account_id`
    ///
    /// Creates and persists a Stripe customer first when the account has
    /// none. Read, create and write are not transactional.
    pub async fn create_checkout_session(
        &self,
        account_id: &str,
        contact_email: Option<&str>,
    ) -> Result<String> {
        let account_id = require_account_id(account_id)?;

        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Account {account_id} not found")))?;

        let customer_id = match account.customer_id {
            Some(customer_id) => customer_id,
            None => {
                let email = contact_email.map(str::trim).filter(|e| !e.is_empty());
                let customer_id = self.processor.create_customer(account_id, email).await?;
                self.accounts
                    .update_by_id(account_id, &AccountUpdate::customer(customer_id.clone()))
                    .await?;

                tracing::info!(
                    account_id = %account_id,
                    customer_id = %customer_id,
                    "Created Stripe customer"
                );
                customer_id
            }
        };

        let request = CheckoutSessionRequest {
            account_id: account_id.to_string(),
            customer_id,
            price_id: self.price_id.clone(),
            success_url: format!(
                "{}/?checkout=success&session_id={{CHECKOUT_SESSION_ID}}",
                self.public_base_url
            ),
            cancel_url: format!("{}/?checkout=cancelled", self.public_base_url),
        };

        let url = self.processor.create_checkout_session(&request).await?;

        tracing::info!(account_id = %account_id, "Created checkout session");
        Ok(url)
    }

    /// Create a customer portal session for `account_id`
    ///
    /// Fails with `NotFound` before contacting Stripe when the account has
    /// no customer.
    pub async fn create_portal_session(&self, account_id: &str) -> Result<String> {
        let account_id = require_account_id(account_id)?;

        let customer_id = self
            .accounts
            .get(account_id)
            .await?
            .and_then(|account| account.customer_id)
            .ok_or_else(|| {
                PaymentError::NotFound(format!("No billing customer for account {account_id}"))
            })?;

        let url = self
            .processor
            .create_portal_session(&customer_id, &self.public_base_url)
            .await?;

        tracing::info!(account_id = %account_id, "Created portal session");
        Ok(url)
    }

    /// The configured plan's price
    pub async fn plan_price(&self) -> Result<PlanPrice> {
        self.processor.plan_price(&self.price_id).await
    }
}

fn require_account_id(account_id: &str) -> Result<&str> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(PaymentError::InvalidRequest("userId is required".into()));
    }
    Ok(account_id)
}
