//! Payment processor client
//!
//! The outbound calls the session issuer makes. `StripeProcessor` talks to
//! Stripe through `async-stripe`; tests substitute their own implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionMode, Client,
    CreateBillingPortalSession, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionSubscriptionData, CreateCustomer, Customer, CustomerId, Metadata, Price,
    PriceId, RequestStrategy,
};

use crate::error::{PaymentError, Result};

/// Metadata key correlating Stripe objects back to an account
pub const ACCOUNT_METADATA_KEY: &str = "user_id";

/// What a hosted checkout session is created from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub account_id: String,
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// The configured plan price
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPrice {
    /// Unit amount in minor currency units
    pub amount: i64,

    /// Lowercase ISO currency code
    pub currency: String,

    pub price_id: String,
}

/// Outbound payment processor operations
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a customer for this account, returning its id
    async fn create_customer(&self, account_id: &str, email: Option<&str>) -> Result<String>;

    /// Create a hosted checkout session, returning its redirect URL
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<String>;

    /// Create a customer portal session, returning its URL
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String>;

    /// Look up a price
    async fn plan_price(&self, price_id: &str) -> Result<PlanPrice>;
}

/// Stripe client wrapper
pub struct StripeProcessor {
    client: Client,
}

impl StripeProcessor {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

fn account_metadata(account_id: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(ACCOUNT_METADATA_KEY.to_string(), account_id.to_string());
    metadata
}

fn parse_customer_id(customer_id: &str) -> Result<CustomerId> {
    customer_id
        .parse()
        .map_err(|_| PaymentError::Stripe(format!("malformed customer id {customer_id:?}")))
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_customer(&self, account_id: &str, email: Option<&str>) -> Result<String> {
        let mut params = CreateCustomer::new();
        params.email = email;
        params.metadata = Some(account_metadata(account_id));

        // Concurrent checkouts for one account converge on a single customer.
        let client = self
            .client
            .clone()
            .with_strategy(RequestStrategy::Idempotent(format!("customer-{account_id}")));

        let customer = Customer::create(&client, params).await?;
        Ok(customer.id.to_string())
    }

    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<String> {
        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.customer = Some(parse_customer_id(&request.customer_id)?);
        params.client_reference_id = Some(&request.account_id);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.metadata = Some(account_metadata(&request.account_id));
        params.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
            metadata: Some(account_metadata(&request.account_id)),
            ..Default::default()
        });
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);

        let session = CheckoutSession::create(&self.client, params).await?;

        session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String> {
        let mut params = CreateBillingPortalSession::new(parse_customer_id(customer_id)?);
        params.return_url = Some(return_url);

        let session = BillingPortalSession::create(&self.client, params).await?;
        Ok(session.url)
    }

    async fn plan_price(&self, price_id: &str) -> Result<PlanPrice> {
        let id: PriceId = price_id
            .parse()
            .map_err(|_| PaymentError::Config(format!("malformed price id {price_id:?}")))?;

        let price = Price::retrieve(&self.client, &id, &[]).await?;
        plan_price_from(&price)
    }
}

fn plan_price_from(price: &Price) -> Result<PlanPrice> {
    let amount = price
        .unit_amount
        .ok_or_else(|| PaymentError::Stripe(format!("price {} has no unit amount", price.id)))?;
    let currency = price
        .currency
        .as_ref()
        .ok_or_else(|| PaymentError::Stripe(format!("price {} has no currency", price.id)))?;

    Ok(PlanPrice {
        amount,
        currency: currency.to_string(),
        price_id: price.id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_metadata_carries_user_id() {
        let metadata = account_metadata("u1");
        assert_eq!(metadata.get(ACCOUNT_METADATA_KEY).map(String::as_str), Some("u1"));
    }

    #[test]
    fn test_customer_id_must_be_stripe_shaped() {
        assert!(parse_customer_id("cus_123").is_ok());
        assert!(matches!(parse_customer_id("u1"), Err(PaymentError::Stripe(_))));
    }

    fn price(json: serde_json::Value) -> Price {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_plan_price_in_minor_units() {
        let plan = plan_price_from(&price(serde_json::json!({
            "id": "price_boost",
            "currency": "eur",
            "unit_amount": 499,
        })))
        .unwrap();

        assert_eq!(
            plan,
            PlanPrice {
                amount: 499,
                currency: "eur".into(),
                price_id: "price_boost".into(),
            }
        );
    }

    #[test]
    fn test_plan_price_requires_currency_and_amount() {
        let no_currency = price(serde_json::json!({ "id": "price_boost", "unit_amount": 499 }));
        assert!(matches!(plan_price_from(&no_currency), Err(PaymentError::Stripe(_))));

        let no_amount = price(serde_json::json!({ "id": "price_boost", "currency": "usd" }));
        assert!(matches!(plan_price_from(&no_amount), Err(PaymentError::Stripe(_))));
    }
}
