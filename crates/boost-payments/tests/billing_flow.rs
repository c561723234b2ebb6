//! Integration tests for the checkout → webhook → entitlement flow.
//!
//! Exercises the session issuer and the webhook handler against one shared
//! in-memory account store, with a stub processor standing in for Stripe.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use boost_payments::{
    Account, AccountStore, CheckoutSessionRequest, MemoryAccountStore, PaymentError,
    PaymentProcessor, PlanPrice, Result, SessionIssuer, WebhookHandler, WebhookVerifier,
    sign_payload,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const WEBHOOK_SECRET: &str = "whsec_integration";

/// Stripe stand-in that hands out predictable ids
#[derive(Default)]
struct StubStripe {
    customers_created: Mutex<Vec<String>>,
    portal_calls: Mutex<usize>,
}

#[async_trait]
impl PaymentProcessor for StubStripe {
    async fn create_customer(&self, account_id: &str, _email: Option<&str>) -> Result<String> {
        let id = format!("cus_{account_id}");
        self.customers_created.lock().unwrap().push(id.clone());
        Ok(id)
    }

    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<String> {
        Ok(format!(
            "https://checkout.stripe.test/c/pay/cs_test_{}#{}",
            request.account_id, request.customer_id
        ))
    }

    async fn create_portal_session(&self, _customer_id: &str, _return_url: &str) -> Result<String> {
        *self.portal_calls.lock().unwrap() += 1;
        Ok("https://billing.stripe.test/p/session/bps_1".into())
    }

    async fn plan_price(&self, price_id: &str) -> Result<PlanPrice> {
        Ok(PlanPrice {
            amount: 499,
            currency: "usd".into(),
            price_id: price_id.into(),
        })
    }
}

struct Harness {
    store: Arc<MemoryAccountStore>,
    stripe: Arc<StubStripe>,
    issuer: SessionIssuer,
    webhooks: WebhookHandler,
}

impl Harness {
    fn new(accounts: Vec<Account>) -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        for account in accounts {
            store.insert(account).unwrap();
        }
        let stripe = Arc::new(StubStripe::default());

        Self {
            issuer: SessionIssuer::new(
                stripe.clone(),
                store.clone(),
                "price_boost",
                "https://app.example.com",
            ),
            webhooks: WebhookHandler::new(store.clone(), WebhookVerifier::new(WEBHOOK_SECRET)),
            store,
            stripe,
        }
    }

    async fn deliver(&self, event_type: &str, object: serde_json::Value) -> Result<u64> {
        let body = json!({
            "id": format!("evt_{event_type}"),
            "type": event_type,
            "created": chrono::Utc::now().timestamp(),
            "data": { "object": object },
        })
        .to_string();
        let signature = sign_payload(
            WEBHOOK_SECRET,
            chrono::Utc::now().timestamp(),
            body.as_bytes(),
        );

        let outcome = self.webhooks.handle(body.as_bytes(), Some(&signature)).await?;
        Ok(outcome.rows_affected)
    }

    async fn account(&self, id: &str) -> Account {
        self.store.get(id).await.unwrap().expect("account exists")
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn checkout_then_completion_grants_boost() {
    let harness = Harness::new(vec![Account::new("u1")]);

    let url = harness
        .issuer
        .create_checkout_session("u1", Some("u1@example.com"))
        .await
        .unwrap();

    assert!(url.contains("cs_test_u1"));
    assert_eq!(*harness.stripe.customers_created.lock().unwrap(), vec!["cus_u1"]);
    assert_eq!(harness.account("u1").await.customer_id.as_deref(), Some("cus_u1"));
    assert!(!harness.account("u1").await.boosted);

    let rows = harness
        .deliver(
            "checkout.session.completed",
            json!({
                "id": "cs_test_u1",
                "client_reference_id": "u1",
                "customer": "cus_u1",
                "subscription": "sub_1",
            }),
        )
        .await
        .unwrap();

    assert_eq!(rows, 1);
    let account = harness.account("u1").await;
    assert!(account.boosted);
    assert_eq!(account.subscription_id.as_deref(), Some("sub_1"));
}

#[tokio::test]
async fn cancel_then_reactivate_subscription() {
    let harness = Harness::new(vec![Account {
        customer_id: Some("cus_1".into()),
        subscription_id: Some("sub_1".into()),
        boosted: true,
        ..Account::new("u1")
    }]);

    harness
        .deliver(
            "customer.subscription.updated",
            json!({ "id": "sub_1", "status": "canceled" }),
        )
        .await
        .unwrap();
    assert!(!harness.account("u1").await.boosted);

    harness
        .deliver(
            "customer.subscription.updated",
            json!({ "id": "sub_1", "status": "active" }),
        )
        .await
        .unwrap();
    assert!(harness.account("u1").await.boosted);
}

#[tokio::test]
async fn deletion_delivered_last_wins() {
    let harness = Harness::new(vec![Account {
        subscription_id: Some("sub_1".into()),
        ..Account::new("u1")
    }]);

    harness
        .deliver("invoice.payment_succeeded", json!({ "subscription": "sub_1" }))
        .await
        .unwrap();
    assert!(harness.account("u1").await.boosted);

    harness
        .deliver(
            "customer.subscription.deleted",
            json!({ "id": "sub_1", "status": "canceled" }),
        )
        .await
        .unwrap();
    assert!(!harness.account("u1").await.boosted);
}

#[tokio::test]
async fn portal_requires_customer_before_contacting_stripe() {
    let harness = Harness::new(vec![Account::new("u1")]);

    let err = harness.issuer.create_portal_session("u1").await.unwrap_err();

    assert!(matches!(err, PaymentError::NotFound(_)));
    assert_eq!(*harness.stripe.portal_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn unknown_subscription_invoice_is_acknowledged() {
    let harness = Harness::new(vec![Account::new("u1")]);

    let rows = harness
        .deliver("invoice.payment_succeeded", json!({ "subscription": "sub_ghost" }))
        .await
        .unwrap();

    assert_eq!(rows, 0);
    assert_eq!(harness.account("u1").await, Account::new("u1"));
}
