//! Integration configuration
//!
//! Loaded once at startup. Loaders take a lookup function so callers decide
//! where values come from; `from_env` reads the process environment.

use crate::error::{PaymentError, Result};

/// Stripe integration settings
#[derive(Clone, Debug)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: String,

    /// The single plan price every checkout uses
    pub price_id: String,

    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: String,
}

impl StripeConfig {
    /// Create from environment variables
    ///
    /// `Ok(None)` when none of the Stripe variables are set, which disables
    /// payments. A partially configured group is an error.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let secret_key = optional(&lookup, "STRIPE_SECRET_KEY");
        let price_id = optional(&lookup, "STRIPE_PRICE_ID");
        let webhook_secret = optional(&lookup, "STRIPE_WEBHOOK_SECRET");

        match (secret_key, price_id, webhook_secret) {
            (None, None, None) => Ok(None),
            (Some(secret_key), Some(price_id), Some(webhook_secret)) => Ok(Some(Self {
                secret_key,
                price_id,
                webhook_secret,
            })),
            (secret_key, price_id, webhook_secret) => {
                let missing: Vec<&str> = [
                    ("STRIPE_SECRET_KEY", secret_key.is_none()),
                    ("STRIPE_PRICE_ID", price_id.is_none()),
                    ("STRIPE_WEBHOOK_SECRET", webhook_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();

                Err(PaymentError::Config(format!(
                    "Stripe is partially configured, missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// Account store settings
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base URL of the Supabase project
    pub url: String,

    /// Privileged service-role key
    pub service_key: String,

    /// Table holding account rows
    pub table: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            url: required(&lookup, "SUPABASE_URL")?,
            service_key: required(&lookup, "SUPABASE_SERVICE_ROLE_KEY")?,
            table: optional(&lookup, "ACCOUNTS_TABLE").unwrap_or_else(|| "users".into()),
        })
    }
}

/// A trimmed, non-empty value if set
pub fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A value that must be present for the service to start
pub fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    optional(lookup, key).ok_or_else(|| PaymentError::Config(format!("{key} not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_stripe_absent_disables_payments() {
        let config = StripeConfig::from_lookup(env(&[])).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_stripe_partial_group_fails() {
        let err = StripeConfig::from_lookup(env(&[("STRIPE_SECRET_KEY", "sk_test_1")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("STRIPE_PRICE_ID"));
        assert!(message.contains("STRIPE_WEBHOOK_SECRET"));
        assert!(!message.contains("STRIPE_SECRET_KEY,"));
    }

    #[test]
    fn test_stripe_complete_group() {
        let config = StripeConfig::from_lookup(env(&[
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("STRIPE_PRICE_ID", "price_1"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_1"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.price_id, "price_1");
    }

    #[test]
    fn test_store_requires_url_and_key() {
        let err = StoreConfig::from_lookup(env(&[("SUPABASE_URL", "https://db.test")])).unwrap_err();
        assert!(matches!(err, PaymentError::Config(_)));

        let config = StoreConfig::from_lookup(env(&[
            ("SUPABASE_URL", "https://db.test"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service"),
        ]))
        .unwrap();
        assert_eq!(config.table, "users");
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = StoreConfig::from_lookup(env(&[
            ("SUPABASE_URL", "  "),
            ("SUPABASE_SERVICE_ROLE_KEY", "service"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }
}
