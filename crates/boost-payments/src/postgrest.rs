//! Supabase / PostgREST account store
//!
//! Talks to the REST endpoint of the data store with the privileged
//! service-role key. Every operation is a single filtered request.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::account::{Account, AccountStore, AccountUpdate};
use crate::config::StoreConfig;
use crate::error::{PaymentError, Result};

const ACCOUNT_COLUMNS: &str = "id,stripe_customer_id,stripe_subscription_id,is_boosted";

/// Account store backed by PostgREST
pub struct PostgrestAccountStore {
    http: reqwest::Client,
    table_url: String,
}

impl PostgrestAccountStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.service_key)
            .map_err(|_| PaymentError::Config("service key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|_| PaymentError::Config("service key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PaymentError::Config(format!("failed to build store client: {e}")))?;

        Ok(Self {
            http,
            table_url: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
        })
    }

    async fn select(&self, filter: (&str, String)) -> Result<Vec<Account>> {
        let response = self
            .http
            .get(&self.table_url)
            .query(&[filter, ("select", ACCOUNT_COLUMNS.to_string())])
            .send()
            .await
            .map_err(|e| PaymentError::Storage(e.to_string()))?;

        ensure_success(response, "select accounts")
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::Storage(format!("unreadable account rows: {e}")))
    }

    async fn patch(&self, filter: (&str, String), update: &AccountUpdate) -> Result<u64> {
        if update.is_empty() {
            return Ok(0);
        }

        let response = self
            .http
            .patch(&self.table_url)
            .query(&[filter, ("select", "id".to_string())])
            .header("Prefer", "return=representation")
            .json(update)
            .send()
            .await
            .map_err(|e| PaymentError::Storage(e.to_string()))?;

        let touched: Vec<serde_json::Value> = ensure_success(response, "update accounts")
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::Storage(format!("unreadable update result: {e}")))?;

        Ok(touched.len() as u64)
    }
}

fn eq<'a>(column: &'a str, value: &str) -> (&'a str, String) {
    (column, format!("eq.{value}"))
}

async fn ensure_success(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    // Keep a short preview of the response body for debugging.
    let preview: String = body.trim().chars().take(512).collect();

    tracing::error!(status = %status, body = %preview, "{context} failed");
    Err(PaymentError::Storage(format!("{context} failed with status {status}")))
}

#[async_trait]
impl AccountStore for PostgrestAccountStore {
    async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        let rows = self.select(eq("id", account_id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_by_id(&self, account_id: &str, update: &AccountUpdate) -> Result<u64> {
        self.patch(eq("id", account_id), update).await
    }

    async fn update_by_subscription(
        &self,
        subscription_id: &str,
        update: &AccountUpdate,
    ) -> Result<u64> {
        self.patch(eq("stripe_subscription_id", subscription_id), update)
            .await
    }

    async fn list_boosted(&self) -> Result<Vec<Account>> {
        let response = self
            .http
            .get(&self.table_url)
            .query(&[
                ("is_boosted", "eq.true"),
                ("select", ACCOUNT_COLUMNS),
                ("order", "id.asc"),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Storage(e.to_string()))?;

        ensure_success(response, "list boosted accounts")
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::Storage(format!("unreadable account rows: {e}")))
    }
}
