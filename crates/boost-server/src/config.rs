//! Server configuration
//!
//! Everything the process needs before it binds a socket. Missing mandatory
//! values abort startup.

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use boost_payments::{PaymentError, Result, StoreConfig, StripeConfig, optional, required};

/// Which browser origins may call the API
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(raw: Option<String>) -> Self {
        let Some(raw) = raw else {
            return AllowedOrigins::Any;
        };

        let origins: Vec<String> = raw
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }

    pub fn cors_layer(&self) -> Result<CorsLayer> {
        let origin = match self {
            AllowedOrigins::Any => AllowOrigin::from(Any),
            AllowedOrigins::List(origins) => {
                let values = origins
                    .iter()
                    .map(|o| {
                        HeaderValue::from_str(o)
                            .map_err(|_| PaymentError::Config(format!("invalid CORS origin {o:?}")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                AllowOrigin::list(values)
            }
        };

        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any))
    }
}

/// Process configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub public_base_url: String,
    pub allowed_origins: AllowedOrigins,
    pub store: StoreConfig,
    /// `None` disables payments
    pub stripe: Option<StripeConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match optional(&lookup, "PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| PaymentError::Config(format!("PORT is not a port number: {raw}")))?,
            None => 3000,
        };

        Ok(Self {
            port,
            public_base_url: required(&lookup, "PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            allowed_origins: AllowedOrigins::parse(optional(&lookup, "ALLOWED_ORIGINS")),
            store: StoreConfig::from_lookup(&lookup)?,
            stripe: StripeConfig::from_lookup(&lookup)?,
        })
    }
}
