//! Commerce backend REST client.
//!
//! # Architecture
//!
//! - The backend owns every business record (users, addresses, products,
//!   orders, payments). Nothing is synced locally; each call goes straight
//!   to the API.
//! - Responses use the envelope `{ success, message, data }`; the client
//!   unwraps it and turns failures into [`BackendError`].
//! - Read-mostly lookups (categories, settings, payment methods, order
//!   statuses) are cached in memory via `moka` for 5 minutes. Carts,
//!   addresses and orders are never cached.
//! - Requests are not retried.

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Whether the caller must sign in again.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// The backend's own message, when it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message) | Self::NotFound(message) => Some(message),
            Self::Api { message, .. } => Some(message),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => None,
        }
    }
}

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "envelope_success_default")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

const fn envelope_success_default() -> bool {
    true
}

/// Body of a non-2xx response. Either field may carry the message.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self, fallback: &str) -> String {
        self.message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_defaults_to_success() {
        let envelope: Envelope<Vec<u32>> = serde_json::from_str(r#"{"data":[1,2]}"#).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data, Some(vec![1, 2]));
    }

    #[test]
    fn test_error_body_prefers_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message":"Insufficient stock","error":"x"}"#).unwrap();
        assert_eq!(body.into_message("fallback"), "Insufficient stock");

        let body: ErrorBody = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert_eq!(body.into_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_backend_message() {
        let err = BackendError::Api {
            status: 400,
            message: "Only 2 left".to_string(),
        };
        assert_eq!(err.backend_message(), Some("Only 2 left"));
        assert!(!err.is_unauthorized());
        assert!(BackendError::Unauthorized("expired".to_string()).is_unauthorized());
    }
}
