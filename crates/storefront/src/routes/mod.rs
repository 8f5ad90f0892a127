//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST /api/auth/login              - Sign in
//! POST /api/auth/register           - Create an account
//! POST /api/auth/guest              - Continue as guest
//! POST /api/auth/logout             - Sign out
//! GET  /api/auth/me                 - Current user
//!
//! # Catalog
//! GET  /api/products                - Product listing
//! GET  /api/products/{id}           - Product detail
//! GET  /api/categories              - Categories
//! GET  /api/settings                - Site settings
//! GET  /api/seo-content             - SEO content
//! GET  /api/media                   - Media library
//!
//! # Cart
//! GET  /api/cart                    - Cart contents
//! POST /api/cart/add                - Add a product
//! POST /api/cart/update             - Change a line's quantity
//! POST /api/cart/remove             - Remove a line
//! POST /api/cart/clear              - Empty the cart
//! GET  /api/cart/count              - Badge count
//!
//! # Wishlist
//! GET  /api/wishlist                - Wishlisted products
//! POST /api/wishlist                - Add a product
//! DELETE /api/wishlist/{id}         - Remove a product
//! POST /api/wishlist/{id}/move-to-cart
//!
//! # Checkout
//! GET  /api/checkout                - Checkout state
//! POST /api/checkout/start          - Check out the cart
//! POST /api/checkout/buy-now        - Check out a single product
//! POST /api/checkout/step           - Go back to an earlier step
//! GET  /api/checkout/addresses      - Saved addresses (step 1)
//! POST /api/checkout/addresses      - Add and select an address
//! POST /api/checkout/address        - Select an address, go to step 2
//! GET  /api/checkout/shipping-methods
//! POST /api/checkout/shipping-method - Select a method, go to step 3
//! GET  /api/checkout/payment-methods
//! POST /api/checkout/payment        - Pay and place the order
//! POST /api/checkout/razorpay/verify
//! GET  /checkout/paypal/success     - PayPal return URL
//! GET  /checkout/paypal/cancel      - PayPal cancel URL
//!
//! # Orders
//! GET  /api/orders                  - Order history
//! GET  /api/orders/{id}             - Order detail
//!
//! # GST
//! GET  /api/gst/{gstin}             - Validate and autofill
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod gst;
pub mod orders;
pub mod payments;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/guest", post(auth::guest))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/categories", get(catalog::categories))
        .route("/settings", get(catalog::settings))
        .route("/seo-content", get(catalog::seo_content))
        .route("/media", get(catalog::media))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::wishlist).post(cart::add_to_wishlist))
        .route("/{product_id}", delete(cart::remove_from_wishlist))
        .route("/{product_id}/move-to-cart", post(cart::move_to_cart))
}

/// Create the checkout API routes router.
///
/// Payment submission and verification get the stricter limiter; each call
/// can create a provider order upstream.
pub fn checkout_routes() -> Router<AppState> {
    let payment = Router::new()
        .route("/payment", post(checkout::submit_payment))
        .route("/razorpay/verify", post(payments::razorpay_verify))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/", get(checkout::show))
        .route("/start", post(checkout::start))
        .route("/buy-now", post(cart::buy_now))
        .route("/step", post(checkout::go_to_step))
        .route(
            "/addresses",
            get(checkout::addresses).post(checkout::add_address),
        )
        .route("/address", post(checkout::select_address))
        .route("/shipping-methods", get(checkout::shipping_methods))
        .route("/shipping-method", post(checkout::select_shipping_method))
        .route("/payment-methods", get(checkout::payment_methods))
        .merge(payment)
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/orders", order_routes())
        .route("/gst/{gstin}", get(gst::lookup))
        .layer(api_rate_limiter())
        .nest("/auth", auth_routes())
        .nest("/checkout", checkout_routes());

    Router::new()
        .nest("/api", api)
        // PayPal sends the browser back here
        .route("/checkout/paypal/success", get(payments::paypal_success))
        .route("/checkout/paypal/cancel", get(payments::paypal_cancel))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use secrecy::ExposeSecret;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::config::tests::test_config;

    fn app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(config.database_url.expose_secret())
            .unwrap();
        let state = AppState::new(config, pool).unwrap();
        let sessions = SessionManagerLayer::new(MemoryStore::default());

        routes().layer(sessions).with_state(state)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("cf-connecting-ip", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("cf-connecting-ip", "203.0.113.9")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let response = app().oneshot(get("/api/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["item_count"], 0);
        assert_eq!(body["items"], json!([]));
    }

    #[tokio::test]
    async fn test_me_without_session() {
        let response = app().oneshot(get("/api/auth/me")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["authenticated"], false);
        assert_eq!(body["user"], Value::Null);
    }

    #[tokio::test]
    async fn test_addresses_require_auth() {
        let response = app()
            .oneshot(get("/api/checkout/addresses"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "auth_required");
    }

    #[tokio::test]
    async fn test_payment_requires_auth() {
        let response = app()
            .oneshot(post_json(
                "/api/checkout/payment",
                &json!({ "method": "Cash on Delivery" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_fresh_checkout_starts_at_address_step() {
        let response = app().oneshot(get("/api/checkout")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["step"], 1);
        assert_eq!(body["payment_state"], "idle");
        assert_eq!(body["lines"], json!([]));
    }

    #[tokio::test]
    async fn test_start_checkout_of_empty_cart() {
        let response = app()
            .oneshot(post_json("/api/checkout/start", &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["step"], 1);
        assert_eq!(body["lines"], json!([]));
    }

    #[tokio::test]
    async fn test_shipping_methods_need_an_address() {
        let response = app()
            .oneshot(get("/api/checkout/shipping-methods"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert_eq!(body["error"], "checkout_incomplete");
        assert_eq!(body["step"], 1);
    }

    #[tokio::test]
    async fn test_cannot_skip_ahead() {
        let response = app()
            .oneshot(post_json("/api/checkout/step", &json!({ "step": 3 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_step_number() {
        let response = app()
            .oneshot(post_json("/api/checkout/step", &json!({ "step": 4 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_gst_checksum_rejected_before_backend() {
        let response = app()
            .oneshot(get("/api/gst/24AAACC1206D1ZN"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_missing_line() {
        let response = app()
            .oneshot(post_json(
                "/api/cart/update",
                &json!({ "productId": "p-1", "quantity": 2 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wishlist_round_trip_in_one_session() {
        let response = app()
            .oneshot(post_json("/api/wishlist", &json!({ "product_id": "p-9" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["product_ids"], json!(["p-9"]));
    }
}
