//! Wire types for the commerce backend.
//!
//! Field names follow the backend (camelCase, `_id`). Records the storefront
//! only passes through keep unknown fields in `extra` so nothing is lost on
//! the way to the browser.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lustre_core::cart::CartItem;
use lustre_core::{CategoryId, ColorId, OrderId, OrderStatusId, ProductId, RecordStatus, SizeId, UserId, UserRole};

// =============================================================================
// Auth
// =============================================================================

/// A user record as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_no: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

/// Result of login, registration and guest login.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: BackendUser,
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPayload")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_no: Option<&'a str>,
}

// =============================================================================
// Catalog
// =============================================================================

const fn default_min_order_limit() -> u32 {
    1
}

/// A product. Only the fields the cart needs are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_min_order_limit")]
    pub min_order_limit: u32,
    #[serde(default)]
    pub max_order_limit: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// A cart line for this product at its current price and limits.
    #[must_use]
    pub fn to_cart_item(
        &self,
        quantity: u32,
        color_id: Option<ColorId>,
        size_id: Option<SizeId>,
    ) -> CartItem {
        CartItem {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            mrp: self.mrp,
            quantity,
            min_order_limit: self.min_order_limit,
            max_order_limit: self.max_order_limit,
            stock: self.stock,
            color_id,
            size_id,
            image: self.images.first().cloned(),
        }
    }
}

/// Query string for the product listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// One page of products.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "pages")]
    pub total_pages: Option<u32>,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

/// Site settings. `taxRate` drives checkout tax; the rest passes through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Orders
// =============================================================================

/// An order status (`pending`, `shipped`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatus {
    #[serde(rename = "_id")]
    pub id: OrderStatusId,
    pub name: String,
}

/// Find the `pending` status, matched case-insensitively.
#[must_use]
pub fn pending_status(statuses: &[OrderStatus]) -> Option<&OrderStatus> {
    statuses
        .iter()
        .find(|s| s.name.trim().eq_ignore_ascii_case("pending"))
}

/// An order from the shopper's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The order record returned by order creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedOrder {
    #[serde(rename = "_id", default)]
    pub id: Option<OrderId>,
}

// =============================================================================
// Payments
// =============================================================================

/// Body of `POST /payments/process/{PROVIDER}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProcessRequest<'a> {
    pub amount: Decimal,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

/// Provider order created by the backend.
///
/// PayPal returns an approval URL and its order ID (which comes back as the
/// `token` query parameter on the return URL). Razorpay returns its order ID,
/// and usually the public key and the amount in paise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProcessResponse {
    #[serde(default, alias = "approveUrl", alias = "redirectUrl")]
    pub approval_url: Option<String>,
    #[serde(default, alias = "id")]
    pub order_id: Option<String>,
    #[serde(default, alias = "keyId")]
    pub key: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Fields the Razorpay widget hands back after a successful payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayVerification {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

// =============================================================================
// GST
// =============================================================================

/// Registration details from `GET /gst/verify/{gstin}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GstRegistration {
    #[serde(default, alias = "tradeName", alias = "businessName")]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "zipCode", alias = "pinCode")]
    pub pincode: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_keeps_unknown_fields() {
        let json = r#"{"_id":"p1","name":"Kundan Necklace","price":"45999.00","mrp":"52000",
            "stock":3,"minOrderLimit":1,"images":["a.jpg","b.jpg"],"status":"active",
            "sku":"KN-01"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.extra.get("sku"), Some(&Value::String("KN-01".to_string())));
        let item = product.to_cart_item(1, None, Some(SizeId::new("18in")));
        assert_eq!(item.price, Decimal::new(45_999, 0));
        assert_eq!(item.image.as_deref(), Some("a.jpg"));
        assert_eq!(item.min_order_limit, 1);
    }

    #[test]
    fn test_auth_payload_accepts_token_alias() {
        let json = r#"{"user":{"_id":"u1","name":"Guest","role":"guest"},"token":"abc"}"#;
        let payload: AuthPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.access_token, "abc");
        assert_eq!(payload.user.role, UserRole::Guest);
        assert!(!format!("{payload:?}").contains("abc"));
    }

    #[test]
    fn test_pending_status_lookup() {
        let statuses = vec![
            OrderStatus {
                id: OrderStatusId::new("s1"),
                name: "Shipped".to_string(),
            },
            OrderStatus {
                id: OrderStatusId::new("s2"),
                name: "Pending".to_string(),
            },
        ];
        assert_eq!(pending_status(&statuses).map(|s| s.id.as_str()), Some("s2"));
        assert!(pending_status(&[]).is_none());
    }

    #[test]
    fn test_payment_response_aliases() {
        let json = r#"{"id":"5O190127TN364715T","approveUrl":"https://www.paypal.com/checkoutnow?token=5O1"}"#;
        let response: PaymentProcessResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.order_id.as_deref(), Some("5O190127TN364715T"));
        assert!(response.approval_url.is_some());
    }
}
