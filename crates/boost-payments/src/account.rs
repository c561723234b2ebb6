//! Account Entitlements
//!
//! The account row owned by the external system of record, and the
//! row-filtered operations this service performs against it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PaymentError, Result};

/// An account row
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque stable account identifier
    pub id: String,

    /// Stripe customer, set once and stable thereafter
    #[serde(rename = "stripe_customer_id", default)]
    pub customer_id: Option<String>,

    /// Stripe subscription, overwritten on lifecycle events
    #[serde(rename = "stripe_subscription_id", default)]
    pub subscription_id: Option<String>,

    /// Whether the account currently holds the boost entitlement
    #[serde(rename = "is_boosted", default)]
    pub boosted: bool,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A partial account row. Only `Some` fields are written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccountUpdate {
    #[serde(rename = "stripe_customer_id", skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(rename = "stripe_subscription_id", skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    #[serde(rename = "is_boosted", skip_serializing_if = "Option::is_none")]
    pub boosted: Option<bool>,
}

impl AccountUpdate {
    /// Only the boost flag
    pub fn boosted(boosted: bool) -> Self {
        Self {
            boosted: Some(boosted),
            ..Default::default()
        }
    }

    /// Only the Stripe customer
    pub fn customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.subscription_id.is_none() && self.boosted.is_none()
    }

    fn apply(&self, account: &mut Account) {
        if let Some(ref customer_id) = self.customer_id {
            account.customer_id = Some(customer_id.clone());
        }
        if let Some(ref subscription_id) = self.subscription_id {
            account.subscription_id = Some(subscription_id.clone());
        }
        if let Some(boosted) = self.boosted {
            account.boosted = boosted;
        }
    }
}

/// Account storage trait
///
/// Updates are unconditional last-write-wins assignments and report how many
/// rows they touched; zero is not an error.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get account by id
    async fn get(&self, account_id: &str) -> Result<Option<Account>>;

    /// Update the account with this id
    async fn update_by_id(&self, account_id: &str, update: &AccountUpdate) -> Result<u64>;

    /// Update every account linked to this Stripe subscription
    async fn update_by_subscription(
        &self,
        subscription_id: &str,
        update: &AccountUpdate,
    ) -> Result<u64>;

    /// All accounts currently boosted
    async fn list_boosted(&self) -> Result<Vec<Account>>;
}

/// In-memory account store (for development)
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a row
    pub fn insert(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        accounts.insert(account.id.clone(), account);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> PaymentError {
    PaymentError::Storage("account store lock poisoned".into())
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.get(account_id).cloned())
    }

    async fn update_by_id(&self, account_id: &str, update: &AccountUpdate) -> Result<u64> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        match accounts.get_mut(account_id) {
            Some(account) => {
                update.apply(account);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_by_subscription(
        &self,
        subscription_id: &str,
        update: &AccountUpdate,
    ) -> Result<u64> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let mut touched = 0;

        for account in accounts.values_mut() {
            if account.subscription_id.as_deref() == Some(subscription_id) {
                update.apply(account);
                touched += 1;
            }
        }

        Ok(touched)
    }

    async fn list_boosted(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        let mut boosted: Vec<Account> = accounts.values().filter(|a| a.boosted).cloned().collect();
        boosted.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(boosted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = AccountUpdate::boosted(true);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "is_boosted": true }));
    }

    #[test]
    fn test_account_reads_store_columns() {
        let row = serde_json::json!({
            "id": "u1",
            "stripe_customer_id": "cus_1",
            "stripe_subscription_id": null,
            "is_boosted": true,
        });
        let account: Account = serde_json::from_value(row).unwrap();
        assert_eq!(account.customer_id.as_deref(), Some("cus_1"));
        assert!(account.subscription_id.is_none());
        assert!(account.boosted);
    }

    #[tokio::test]
    async fn test_update_by_subscription_matches_only_linked_rows() {
        let store = MemoryAccountStore::new();
        store
            .insert(Account {
                subscription_id: Some("sub_1".into()),
                ..Account::new("u1")
            })
            .unwrap();
        store.insert(Account::new("u2")).unwrap();

        let touched = store
            .update_by_subscription("sub_1", &AccountUpdate::boosted(true))
            .await
            .unwrap();

        assert_eq!(touched, 1);
        assert!(store.get("u1").await.unwrap().unwrap().boosted);
        assert!(!store.get("u2").await.unwrap().unwrap().boosted);
    }

    #[tokio::test]
    async fn test_update_missing_row_touches_nothing() {
        let store = MemoryAccountStore::new();
        let touched = store
            .update_by_id("ghost", &AccountUpdate::customer("cus_9"))
            .await
            .unwrap();
        assert_eq!(touched, 0);
        assert!(store.get("ghost").await.unwrap().is_none());
    }
}
