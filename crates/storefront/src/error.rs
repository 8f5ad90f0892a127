//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error renders as JSON:
//!
//! ```json
//! { "error": "out_of_stock", "message": "Only 2 left in stock" }
//! ```
//!
//! Checkout validation errors add `"step"` (the step the client should show)
//! and cart errors add `"toast"`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use lustre_core::cart::CartError;
use lustre_core::checkout::PlaceOrderError;
use lustre_core::gst::GstinError;
use lustre_core::payment::PaymentFlowError;

use crate::backend::BackendError;
use crate::db::RepositoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Commerce backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A cart quantity rule was violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// The checkout form is not ready for an order.
    #[error("Checkout error: {0}")]
    Checkout(#[from] PlaceOrderError),

    /// The payment step is busy or already finished.
    #[error("Payment flow error: {0}")]
    PaymentFlow(#[from] PaymentFlowError),

    /// Malformed GST number.
    #[error("Invalid GSTIN: {0}")]
    Gstin(#[from] GstinError),

    /// The payment provider refused or failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// The backend refused an order for lack of stock.
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    /// The backend session expired; the client must sign in again.
    #[error("Authentication required")]
    AuthRequired,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with invalid field values.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    toast: Option<String>,
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Backend(err) => matches!(
                err,
                BackendError::Http(_) | BackendError::Parse(_) | BackendError::Url(_)
            ) || matches!(err, BackendError::Api { status, .. } if *status >= 500),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Backend(err) => match err {
                BackendError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Api { status, .. } if (400..500).contains(status) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Cart(CartError::LineNotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(_) | Self::Checkout(_) | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PaymentFlow(_) | Self::OutOfStock(_) => StatusCode::CONFLICT,
            Self::Gstin(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::AuthRequired | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, message) = match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                ("internal", "Internal server error".to_string())
            }
            Self::Backend(BackendError::Unauthorized(_)) | Self::AuthRequired => {
                ("auth_required", "Please sign in to continue".to_string())
            }
            Self::Backend(BackendError::NotFound(message)) => ("not_found", message.clone()),
            Self::Backend(err) if !self.is_server_error() => (
                "rejected",
                err.backend_message()
                    .unwrap_or("Request was rejected")
                    .to_string(),
            ),
            Self::Backend(_) => ("backend_unavailable", "External service error".to_string()),
            Self::Cart(CartError::LineNotFound) => ("not_found", CartError::LineNotFound.to_string()),
            Self::Cart(err) => ("invalid_quantity", err.to_string()),
            Self::Checkout(err) => ("checkout_incomplete", err.to_string()),
            Self::PaymentFlow(err) => ("payment_in_progress", err.to_string()),
            Self::Gstin(err) => ("invalid_gstin", err.to_string()),
            Self::Provider(message) => ("payment_failed", message.clone()),
            Self::OutOfStock(message) => ("out_of_stock", message.clone()),
            Self::NotFound(message) => ("not_found", message.clone()),
            Self::Unauthorized(message) => ("unauthorized", message.clone()),
            Self::BadRequest(message) => ("bad_request", message.clone()),
            Self::Validation(message) => ("validation", message.clone()),
            Self::RateLimited => ("rate_limited", "Too many requests".to_string()),
        };

        let step = match self {
            Self::Checkout(err) => err.redirect_step().map(u8::from),
            _ => None,
        };
        let toast = match self {
            Self::Cart(_) => Some(message.clone()),
            _ => None,
        };

        ErrorBody {
            error,
            message,
            step,
            toast,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Provider(_) | Self::OutOfStock(_)) {
            tracing::warn!(error = %self, "Checkout rejected");
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Selected shipping method", Some(&[("method_id", "m-surat")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::NotFound("test".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::AuthRequired), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::OutOfStock("Out of stock".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Provider("PayPal is unavailable".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::Api {
                status: 400,
                message: "Email already registered".to_string(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::Api {
                status: 503,
                message: "down".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_auth_required_body() {
        let (status, body) = body_json(AppError::AuthRequired).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "auth_required");
    }

    #[tokio::test]
    async fn test_checkout_error_carries_step() {
        let (status, body) = body_json(PlaceOrderError::MissingShippingAddress.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["step"], 1);
        assert_eq!(body["message"], "Please select a shipping address");

        let (_, body) = body_json(PlaceOrderError::EmptyCart.into()).await;
        assert!(body.get("step").is_none());
    }

    #[tokio::test]
    async fn test_cart_error_is_a_toast() {
        let (status, body) = body_json(CartError::BelowMinimum { min: 2 }.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["toast"], "Minimum order quantity is 2");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (_, body) = body_json(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
