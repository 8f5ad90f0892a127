//! HTTP client for the commerce backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use lustre_core::gst::Gstin;
use lustre_core::order::OrderRequest;
use lustre_core::payment::PaymentMethod;
use lustre_core::shipping::{ShippingAddress, ShippingMethod};
use lustre_core::{OrderId, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AuthPayload, Category, CreatedOrder, GstRegistration, LoginRequest, Order, OrderStatus,
    PaymentProcessRequest, PaymentProcessResponse, Product, ProductPage, ProductQuery,
    RazorpayVerification, RegisterRequest, Settings,
};
use super::{BackendError, Envelope, ErrorBody};
use crate::config::BackendConfig;

/// How long read-mostly lookups stay cached.
const CACHE_TTL: Duration = Duration::from_secs(300);

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the commerce backend REST API.
///
/// Cheap to clone. Calls that act for a shopper take their bearer token;
/// public catalog calls take none.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, BackendError> {
        let request = self
            .request(Method::POST, "auth/login", None)?
            .json(&LoginRequest { email, password });
        self.send(request).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the registration.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        mobile_no: Option<&str>,
    ) -> Result<AuthPayload, BackendError> {
        let request = self
            .request(Method::POST, "auth/register", None)?
            .json(&RegisterRequest {
                name,
                email,
                password,
                mobile_no,
            });
        self.send(request).await
    }

    /// Start a guest session.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn guest_login(&self) -> Result<AuthPayload, BackendError> {
        let request = self.request(Method::POST, "auth/guest-login", None)?;
        self.send(request).await
    }

    /// Saved addresses of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, access_token))]
    pub async fn addresses(&self, access_token: &str) -> Result<Vec<ShippingAddress>, BackendError> {
        let request = self.request(Method::GET, "auth/get-all-address", Some(access_token))?;
        self.send(request).await
    }

    /// Save a new address and return it with its ID.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, access_token, address))]
    pub async fn add_address(
        &self,
        access_token: &str,
        address: &ShippingAddress,
    ) -> Result<ShippingAddress, BackendError> {
        let request = self
            .request(Method::POST, "auth/add-address", Some(access_token))?
            .json(address);
        self.send(request).await
    }

    // =========================================================================
    // Checkout lookups
    // =========================================================================

    /// All shipping methods, active or not. Never cached: admins toggle
    /// them during sales.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn shipping_methods(&self) -> Result<Vec<ShippingMethod>, BackendError> {
        let request = self.request(Method::GET, "shipping-method/get-all", None)?;
        self.send(request).await
    }

    /// All payment methods (cached).
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn payment_methods(&self) -> Result<Arc<Vec<PaymentMethod>>, BackendError> {
        if let Some(CacheValue::PaymentMethods(methods)) =
            self.inner.cache.get(&CacheKey::PaymentMethods).await
        {
            debug!("Cache hit for payment methods");
            return Ok(methods);
        }

        let request = self.request(Method::GET, "payment-method/get-all", None)?;
        let methods: Arc<Vec<PaymentMethod>> = Arc::new(self.send(request).await?);
        self.inner
            .cache
            .insert(
                CacheKey::PaymentMethods,
                CacheValue::PaymentMethods(Arc::clone(&methods)),
            )
            .await;
        Ok(methods)
    }

    /// All order statuses (cached). `refresh` bypasses and replaces the
    /// cached list.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn order_statuses(&self, refresh: bool) -> Result<Arc<Vec<OrderStatus>>, BackendError> {
        if refresh {
            self.inner.cache.invalidate(&CacheKey::OrderStatuses).await;
        } else if let Some(CacheValue::OrderStatuses(statuses)) =
            self.inner.cache.get(&CacheKey::OrderStatuses).await
        {
            debug!("Cache hit for order statuses");
            return Ok(statuses);
        }

        let request = self.request(Method::GET, "order-status/get-all", None)?;
        let statuses: Arc<Vec<OrderStatus>> = Arc::new(self.send(request).await?);
        self.inner
            .cache
            .insert(
                CacheKey::OrderStatuses,
                CacheValue::OrderStatuses(Arc::clone(&statuses)),
            )
            .await;
        Ok(statuses)
    }

    // =========================================================================
    // Payments & orders
    // =========================================================================

    /// Create a provider order. `provider` is the backend path code
    /// (`PAYPAL`, `RAZORPAY`).
    ///
    /// # Errors
    ///
    /// Returns error if the backend or the provider rejects the payment.
    #[instrument(skip(self, access_token, body))]
    pub async fn process_payment(
        &self,
        access_token: &str,
        provider: &str,
        body: &PaymentProcessRequest<'_>,
    ) -> Result<PaymentProcessResponse, BackendError> {
        let request = self
            .request(
                Method::POST,
                &format!("payments/process/{provider}"),
                Some(access_token),
            )?
            .json(body);
        self.send(request).await
    }

    /// Verify a Razorpay payment signature.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` if verification fails.
    #[instrument(skip(self, access_token, verification), fields(order_id = %verification.razorpay_order_id))]
    pub async fn verify_razorpay(
        &self,
        access_token: &str,
        verification: &RazorpayVerification,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, "payments/verify/razorpay", Some(access_token))?
            .json(verification);
        self.send_unit(request).await
    }

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the order (stock, validation).
    #[instrument(skip(self, access_token, order), fields(total = %order.total, lines = order.products.len()))]
    pub async fn create_order(
        &self,
        access_token: &str,
        order: &OrderRequest,
    ) -> Result<CreatedOrder, BackendError> {
        let request = self
            .request(Method::POST, "orders", Some(access_token))?
            .json(order);
        self.send(request).await
    }

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self, access_token))]
    pub async fn my_orders(&self, access_token: &str) -> Result<Vec<Order>, BackendError> {
        let request = self.request(Method::GET, "orders/my-orders", Some(access_token))?;
        self.send(request).await
    }

    /// One order of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the order does not exist.
    #[instrument(skip(self, access_token))]
    pub async fn order(&self, access_token: &str, id: &OrderId) -> Result<Order, BackendError> {
        let request = self.request(Method::GET, &format!("orders/{id}"), Some(access_token))?;
        self.send(request).await
    }

    // =========================================================================
    // Catalog & content
    // =========================================================================

    /// A page of products.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, BackendError> {
        let mut url = self.url("product/get-all")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = &query.category {
                pairs.append_pair("category", category);
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(sort) = &query.sort {
                pairs.append_pair("sort", sort);
            }
        }
        let request = self.inner.client.get(url);
        self.send(request).await
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let request = self.request(Method::GET, &format!("product/get/{id}"), None)?;
        self.send(request).await
    }

    /// All categories (cached).
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, BackendError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let request = self.request(Method::GET, "category/get-all-categories", None)?;
        let categories: Arc<Vec<Category>> = Arc::new(self.send(request).await?);
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Site settings (cached).
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn settings(&self) -> Result<Arc<Settings>, BackendError> {
        if let Some(CacheValue::Settings(settings)) =
            self.inner.cache.get(&CacheKey::Settings).await
        {
            debug!("Cache hit for settings");
            return Ok(settings);
        }

        let request = self.request(Method::GET, "settings/get-all", None)?;
        let settings: Arc<Settings> = Arc::new(self.send(request).await?);
        self.inner
            .cache
            .insert(CacheKey::Settings, CacheValue::Settings(Arc::clone(&settings)))
            .await;
        Ok(settings)
    }

    /// SEO content entries, passed through as-is.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn seo_content(&self) -> Result<serde_json::Value, BackendError> {
        let request = self.request(Method::GET, "seo-content/get-all", None)?;
        self.send(request).await
    }

    /// Media library entries, passed through as-is.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn media(&self) -> Result<serde_json::Value, BackendError> {
        let request = self.request(Method::GET, "media/get-all", None)?;
        self.send(request).await
    }

    /// Look up a GST registration.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the number is not registered.
    #[instrument(skip(self), fields(gstin = %gstin))]
    pub async fn verify_gst(&self, gstin: &Gstin) -> Result<GstRegistration, BackendError> {
        let request = self.request(Method::GET, &format!("gst/verify/{gstin}"), None)?;
        self.send(request).await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
    ) -> Result<RequestBuilder, BackendError> {
        let builder = self.inner.client.request(method, self.url(path)?);
        Ok(match access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send a request and unwrap the envelope's `data`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.send_envelope::<T>(request)
            .await?
            .ok_or_else(|| BackendError::Parse("response carried no data".to_string()))
    }

    /// Send a request whose `data` is irrelevant.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), BackendError> {
        self.send_envelope::<serde_json::Value>(request)
            .await
            .map(|_| ())
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = error_for_status(status, &body);
            tracing::warn!(status = %status, error = %err, "Backend returned non-success status");
            return Err(err);
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e.to_string())
        })?;

        if !envelope.success {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }

        Ok(envelope.data)
    }
}

/// Map a non-2xx response to an error, keeping the backend's message.
fn error_for_status(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .unwrap_or_default()
        .into_message(status.canonical_reason().unwrap_or("request failed"));

    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status_unauthorized() {
        let err = error_for_status(StatusCode::UNAUTHORIZED, r#"{"message":"jwt expired"}"#);
        assert!(matches!(err, BackendError::Unauthorized(ref m) if m == "jwt expired"));
    }

    #[test]
    fn test_error_for_status_non_json_body() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert!(matches!(err, BackendError::Api { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[test]
    fn test_error_for_status_not_found() {
        let err = error_for_status(StatusCode::NOT_FOUND, r#"{"error":"Order not found"}"#);
        assert_eq!(err.backend_message(), Some("Order not found"));
    }

    #[test]
    fn test_url_keeps_base_path() {
        let config = BackendConfig {
            base_url: Url::parse("https://api.lustrejewels.in/v1/").unwrap(),
            timeout: Duration::from_secs(1),
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(
            client.url("/orders/my-orders").unwrap().as_str(),
            "https://api.lustrejewels.in/v1/orders/my-orders"
        );
    }
}
