//! Unified error handling for admin.
//!
//! Errors render as `{"error": "...", "message": "..."}`. Backend and
//! session failures are captured to Sentry; their details stay in the logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::AdminBackendError;
use crate::models::ValidationError;

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Commerce backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] AdminBackendError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A form field failed local validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Session(_)
            | Self::Internal(_)
            | Self::Backend(
                AdminBackendError::Http(_) | AdminBackendError::Parse(_) | AdminBackendError::Url(_),
            ) => true,
            Self::Backend(AdminBackendError::Api { status, .. }) => *status >= 500,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(AdminBackendError::Unauthorized(_)) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Backend(AdminBackendError::NotFound(_)) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Backend(AdminBackendError::Api { status, .. }) if (400..500).contains(status) => {
                StatusCode::BAD_REQUEST
            }
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, message) = match self {
            Self::Session(_) | Self::Internal(_) => ("internal", "Internal server error".to_string()),
            Self::Backend(AdminBackendError::Unauthorized(_)) => {
                ("auth_required", "Please sign in again".to_string())
            }
            Self::Backend(AdminBackendError::NotFound(message)) => ("not_found", message.clone()),
            Self::Backend(AdminBackendError::Api { status, message }) if *status < 500 => {
                ("rejected", message.clone())
            }
            Self::Backend(_) => ("backend_unavailable", "External service error".to_string()),
            Self::Validation(err) => ("validation", err.to_string()),
            Self::NotFound(message) => ("not_found", message.clone()),
            Self::Unauthorized(message) => ("unauthorized", message.clone()),
            Self::Forbidden(message) => ("forbidden", message.clone()),
            Self::BadRequest(message) => ("bad_request", message.clone()),
        };
        ErrorBody { error, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(admin_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("category c-1".to_string());
        assert_eq!(err.to_string(), "Not found: category c-1");
    }

    #[tokio::test]
    async fn test_backend_rejection_keeps_message() {
        let (status, body) = render(AppError::Backend(AdminBackendError::Api {
            status: 409,
            message: "Category has products".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "rejected");
        assert_eq!(body["message"], "Category has products");
    }

    #[tokio::test]
    async fn test_backend_outage_hides_details() {
        let (status, body) = render(AppError::Backend(AdminBackendError::Parse(
            "expected value at line 1".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "External service error");
    }

    #[tokio::test]
    async fn test_expired_token_asks_for_sign_in() {
        let (status, body) = render(AppError::Backend(AdminBackendError::Unauthorized(
            "jwt expired".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "auth_required");
    }

    #[tokio::test]
    async fn test_status_codes() {
        assert_eq!(
            AppError::Forbidden("x".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Internal("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::BadRequest("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
