//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Caller input missing or malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook authenticity check failed, or the verified body was unusable
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Referenced account or customer is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Account store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// A required integration is not configured at runtime
    #[error("Not configured: {0}")]
    Unconfigured(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Stripe(_) | PaymentError::Storage(_))
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::InvalidRequest(_) => "INVALID_REQUEST",
            PaymentError::SignatureInvalid(_) => "SIGNATURE_INVALID",
            PaymentError::NotFound(_) => "NOT_FOUND",
            PaymentError::Stripe(_) => "UPSTREAM_FAILURE",
            PaymentError::Storage(_) => "STORAGE_FAILURE",
            PaymentError::Unconfigured(_) => "UNCONFIGURED",
            PaymentError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Get user-friendly message
    ///
    /// Signature failures never say which part of the check failed.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::InvalidRequest(msg) => msg.clone(),
            PaymentError::SignatureInvalid(_) => "Invalid signature".into(),
            PaymentError::NotFound(msg) => msg.clone(),
            PaymentError::Stripe(_) => "Payment processing failed. Please try again.".into(),
            PaymentError::Storage(_) => "Account storage is unavailable.".into(),
            PaymentError::Unconfigured(_) => "Payments are not configured.".into(),
            PaymentError::Config(_) => "Service configuration error.".into(),
        }
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        PaymentError::Stripe(err.to_string())
    }
}

#[cfg(feature = "axum-handlers")]
mod http {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };

    use super::PaymentError;

    impl PaymentError {
        /// HTTP status this error surfaces as
        pub fn status_code(&self) -> StatusCode {
            match self {
                PaymentError::InvalidRequest(_)
                | PaymentError::SignatureInvalid(_)
                | PaymentError::NotFound(_) => StatusCode::BAD_REQUEST,
                PaymentError::Unconfigured(_) => StatusCode::NOT_IMPLEMENTED,
                PaymentError::Stripe(_) | PaymentError::Storage(_) | PaymentError::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }

    impl IntoResponse for PaymentError {
        fn into_response(self) -> Response {
            let body = serde_json::json!({
                "error": self.user_message(),
                "code": self.code(),
            });
            (self.status_code(), Json(body)).into_response()
        }
    }

}
