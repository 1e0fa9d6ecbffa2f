//! REST backend client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, products, carts and orders.
//!   The storefront never stores them locally beyond the visitor's session.
//! - Plain JSON over HTTP with `reqwest`; authenticated calls carry the
//!   visitor's bearer token.
//! - In-memory caching via `moka` for catalog and FAQ responses (5 minute TTL).
//!
//! # Example
//!
//! ```rust,ignore
//! use herbal_storefront::api::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//!
//! let auth = client.login("sage@herbs.test", "hunter22").await?;
//! client.add_to_cart(&auth.token, &product_id, 2).await?;
//! let cart = client.get_cart(&auth.token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error {status}: {}", describe(.message.as_deref()))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// The bearer token is missing, expired, or revoked (401).
    #[error("Unauthorized: {}", describe(.0.as_deref()))]
    Unauthorized(Option<String>),

    /// The requested record does not exist (404).
    #[error("Not found: {}", describe(.0.as_deref()))]
    NotFound(Option<String>),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but lacked a required field.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

fn describe(message: Option<&str>) -> &str {
    message.unwrap_or("(no message)")
}

impl BackendError {
    /// Message to show the visitor: the backend's own message when it sent
    /// one, otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                message: Some(message),
                ..
            }
            | Self::Unauthorized(Some(message))
            | Self::NotFound(Some(message)) => message.clone(),
            Self::RateLimited(seconds) => {
                format!("Too many requests. Please wait {seconds} seconds and try again.")
            }
            _ => fallback.to_string(),
        }
    }

    /// Whether the token should be discarded.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the record was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the failure lies with the backend or the network rather than
    /// the visitor's input.
    #[must_use]
    pub fn is_server_side(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::UnexpectedResponse(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound(Some("Product not found".to_string()));
        assert_eq!(err.to_string(), "Not found: Product not found");

        let err = BackendError::Api {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "API error 500: (no message)");
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = BackendError::Api {
            status: 400,
            message: Some("Only 2 left in stock".to_string()),
        };
        assert_eq!(err.user_message("Could not add item"), "Only 2 left in stock");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = BackendError::Api {
            status: 502,
            message: None,
        };
        assert_eq!(err.user_message("Could not add item"), "Could not add item");
        assert!(err.is_server_side());

        let err = BackendError::RateLimited(30);
        assert_eq!(
            err.user_message("ignored"),
            "Too many requests. Please wait 30 seconds and try again."
        );
    }

    #[test]
    fn test_classification() {
        assert!(BackendError::Unauthorized(None).is_unauthorized());
        assert!(BackendError::NotFound(None).is_not_found());
        assert!(
            !BackendError::Api {
                status: 422,
                message: None
            }
            .is_server_side()
        );
    }
}
