//! Commerce backend client for the back-office.
//!
//! Every call carries the signed-in admin's bearer token. Catalog records
//! are passed through as JSON: the console edits them, the backend owns
//! their shape. Nothing is cached, so an edit is visible on the next read.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use lustre_core::{UserId, UserRole};

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum AdminBackendError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The record does not exist.
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

/// A back-office resource with the backend's CRUD routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Products,
    Categories,
    PaymentMethods,
    ShippingMethods,
}

impl Resource {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Products => "product",
            Self::Categories => "category",
            Self::PaymentMethods => "payment-method",
            Self::ShippingMethods => "shipping-method",
        }
    }

    /// Singular name for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Products => "Product",
            Self::Categories => "Category",
            Self::PaymentMethods => "Payment method",
            Self::ShippingMethods => "Shipping method",
        }
    }

    fn list_path(self) -> String {
        match self {
            Self::Categories => "category/get-all-categories".to_string(),
            other => format!("{}/get-all", other.prefix()),
        }
    }

    fn record_path(self, action: &str, id: &str) -> String {
        format!("{}/{action}/{id}", self.prefix())
    }
}

/// A signed-in backend user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

/// Result of `auth/login`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: LoginUser,
    #[serde(alias = "token")]
    pub access_token: String,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

const fn default_success() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the commerce backend REST API, back-office side.
#[derive(Clone)]
pub struct AdminBackendClient {
    inner: Arc<AdminBackendClientInner>,
}

struct AdminBackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl AdminBackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AdminBackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(AdminBackendClientInner { client, base_url }),
        })
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AdminBackendError::Unauthorized` for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AdminBackendError> {
        let request = self
            .request(Method::POST, "auth/login", None)?
            .json(&LoginRequest { email, password });
        self.send(request).await
    }

    // =========================================================================
    // Catalog resources
    // =========================================================================

    /// All records of a resource, active or not.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, token))]
    pub async fn list(&self, token: &str, resource: Resource) -> Result<Value, AdminBackendError> {
        let request = self.request(Method::GET, &resource.list_path(), Some(token))?;
        self.send(request).await
    }

    /// One record.
    ///
    /// # Errors
    ///
    /// Returns `AdminBackendError::NotFound` if the record does not exist.
    #[instrument(skip(self, token))]
    pub async fn get(
        &self,
        token: &str,
        resource: Resource,
        id: &str,
    ) -> Result<Value, AdminBackendError> {
        let request = self.request(Method::GET, &resource.record_path("get", id), Some(token))?;
        self.send(request).await
    }

    /// Create a record.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the record.
    #[instrument(skip(self, token, body))]
    pub async fn create<B: Serialize + Sync>(
        &self,
        token: &str,
        resource: Resource,
        body: &B,
    ) -> Result<Value, AdminBackendError> {
        let path = format!("{}/create", resource.prefix());
        let request = self.request(Method::POST, &path, Some(token))?.json(body);
        self.send(request).await
    }

    /// Replace a record's fields.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, token, body))]
    pub async fn update<B: Serialize + Sync>(
        &self,
        token: &str,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<Value, AdminBackendError> {
        let request = self
            .request(Method::PUT, &resource.record_path("update", id), Some(token))?
            .json(body);
        self.send(request).await
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns error if the backend refuses the delete.
    #[instrument(skip(self, token))]
    pub async fn delete(
        &self,
        token: &str,
        resource: Resource,
        id: &str,
    ) -> Result<(), AdminBackendError> {
        let request =
            self.request(Method::DELETE, &resource.record_path("delete", id), Some(token))?;
        self.send_envelope::<Value>(request).await.map(|_| ())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Site settings.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, token))]
    pub async fn settings(&self, token: &str) -> Result<Value, AdminBackendError> {
        let request = self.request(Method::GET, "settings/get-all", Some(token))?;
        self.send(request).await
    }

    /// Update site settings.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the settings.
    #[instrument(skip(self, token, body))]
    pub async fn update_settings<B: Serialize + Sync>(
        &self,
        token: &str,
        body: &B,
    ) -> Result<Value, AdminBackendError> {
        let request = self
            .request(Method::PUT, "settings/update", Some(token))?
            .json(body);
        self.send(request).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Every order in the store.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, token))]
    pub async fn orders(&self, token: &str) -> Result<Value, AdminBackendError> {
        let request = self.request(Method::GET, "orders", Some(token))?;
        self.send(request).await
    }

    /// The configured order statuses.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, token))]
    pub async fn order_statuses(&self, token: &str) -> Result<Value, AdminBackendError> {
        let request = self.request(Method::GET, "order-status/get-all", Some(token))?;
        self.send(request).await
    }

    /// Move an order to another status.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the change.
    #[instrument(skip(self, token, body))]
    pub async fn update_order_status<B: Serialize + Sync>(
        &self,
        token: &str,
        id: &str,
        body: &B,
    ) -> Result<Value, AdminBackendError> {
        let request = self
            .request(Method::PUT, &format!("orders/{id}/status"), Some(token))?
            .json(body);
        self.send(request).await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, AdminBackendError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder, AdminBackendError> {
        let builder = self.inner.client.request(method, self.url(path)?);
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AdminBackendError> {
        self.send_envelope::<T>(request)
            .await?
            .ok_or_else(|| AdminBackendError::Parse("response carried no data".to_string()))
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, AdminBackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = error_for_status(status, &body);
            tracing::warn!(status = %status, error = %err, "Backend returned non-success status");
            return Err(err);
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| AdminBackendError::Parse(e.to_string()))?;
        if !envelope.success {
            return Err(AdminBackendError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        Ok(envelope.data)
    }
}

fn error_for_status(status: StatusCode, body: &str) -> AdminBackendError {
    let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdminBackendError::Unauthorized(message),
        StatusCode::NOT_FOUND => AdminBackendError::NotFound(message),
        _ => AdminBackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> AdminBackendClient {
        AdminBackendClient::new(
            Url::parse("https://api.lustrejewels.in/v1/").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(Resource::Products.list_path(), "product/get-all");
        assert_eq!(
            Resource::Categories.list_path(),
            "category/get-all-categories"
        );
        assert_eq!(
            Resource::ShippingMethods.record_path("update", "m-1"),
            "shipping-method/update/m-1"
        );
        assert_eq!(
            Resource::PaymentMethods.record_path("delete", "pm-2"),
            "payment-method/delete/pm-2"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        assert_eq!(
            client().url("/orders").unwrap().as_str(),
            "https://api.lustrejewels.in/v1/orders"
        );
    }

    #[test]
    fn test_forbidden_counts_as_unauthorized() {
        let err = error_for_status(StatusCode::FORBIDDEN, r#"{"message":"Admins only"}"#);
        assert!(matches!(err, AdminBackendError::Unauthorized(ref m) if m == "Admins only"));
    }

    #[test]
    fn test_error_body_falls_back_to_reason() {
        let err = error_for_status(StatusCode::BAD_REQUEST, "");
        assert!(matches!(err, AdminBackendError::Api { status: 400, ref message } if message == "Bad Request"));
    }

    #[test]
    fn test_login_response_debug_redacts_token() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"user":{"_id":"u-1","name":"Meera","role":"admin"},"token":"jwt-abc"}"#,
        )
        .unwrap();
        assert_eq!(response.user.role, UserRole::Admin);
        let debug = format!("{response:?}");
        assert!(!debug.contains("jwt-abc"));
    }
}
