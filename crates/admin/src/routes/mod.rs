//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/login                    - Sign in (backend role must be admin)
//! POST   /api/auth/logout                   - Sign out
//! GET    /api/auth/me                       - Signed-in admin
//!
//! # Catalog
//! GET    /api/products                      - All products
//! GET    /api/products/{id}                 - One product
//! POST   /api/products                      - Create product
//! PUT    /api/products/{id}                 - Update product
//! DELETE /api/products/{id}                 - Delete product
//! GET    /api/categories                    - All categories
//! POST   /api/categories                    - Create category
//! PUT    /api/categories/{id}               - Update category
//! DELETE /api/categories/{id}               - Delete category
//! GET    /api/payment-methods               - All payment methods
//! POST   /api/payment-methods               - Create payment method
//! PUT    /api/payment-methods/{id}          - Update payment method
//! PATCH  /api/payment-methods/{id}/status   - Activate or deactivate
//! DELETE /api/payment-methods/{id}          - Delete payment method
//! GET    /api/shipping-methods              - All shipping methods
//! POST   /api/shipping-methods              - Create shipping method
//! PUT    /api/shipping-methods/{id}         - Update shipping method
//! DELETE /api/shipping-methods/{id}         - Delete shipping method
//!
//! # Settings
//! GET    /api/settings                      - Site settings
//! PUT    /api/settings                      - Update settings
//!
//! # Orders
//! GET    /api/orders                        - All orders
//! PUT    /api/orders/{id}/status            - Change order status
//! GET    /api/order-statuses                - Configured statuses
//! ```

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod settings;

use axum::{
    Extension, Router,
    routing::{get, patch, post, put},
};

use crate::backend::Resource;
use crate::models::{CategoryInput, PaymentMethodInput, ProductInput, ShippingMethodInput};
use crate::state::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::list).post(catalog::create::<ProductInput>),
        )
        .route(
            "/{id}",
            get(catalog::show)
                .put(catalog::update::<ProductInput>)
                .delete(catalog::delete),
        )
        .layer(Extension(Resource::Products))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::list).post(catalog::create::<CategoryInput>),
        )
        .route(
            "/{id}",
            put(catalog::update::<CategoryInput>).delete(catalog::delete),
        )
        .layer(Extension(Resource::Categories))
}

fn payment_method_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::list).post(catalog::create::<PaymentMethodInput>),
        )
        .route(
            "/{id}",
            put(catalog::update::<PaymentMethodInput>).delete(catalog::delete),
        )
        .route("/{id}/status", patch(catalog::set_status))
        .layer(Extension(Resource::PaymentMethods))
}

fn shipping_method_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::list).post(catalog::create::<ShippingMethodInput>),
        )
        .route(
            "/{id}",
            put(catalog::update::<ShippingMethodInput>).delete(catalog::delete),
        )
        .layer(Extension(Resource::ShippingMethods))
}

/// Build the complete admin router.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/payment-methods", payment_method_routes())
        .nest("/shipping-methods", shipping_method_routes())
        .route("/settings", get(settings::show).put(settings::update))
        .route("/orders", get(orders::list))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/order-statuses", get(orders::statuses));

    Router::new().nest("/api", api)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::config::tests::test_config;

    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/lustre_admin_test")
            .unwrap();
        let state = AppState::new(test_config(), pool).unwrap();
        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_me_requires_sign_in() {
        let (status, body) =
            send(Request::get("/api/auth/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_catalog_requires_sign_in() {
        for uri in [
            "/api/products",
            "/api/categories",
            "/api/payment-methods",
            "/api/shipping-methods",
            "/api/orders",
            "/api/settings",
        ] {
            let (status, _) = send(Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_create_requires_sign_in() {
        let (status, _) = send(json_request(
            "POST",
            "/api/products",
            r#"{"name":"Ring","price":"500"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let (status, body) = send(json_request(
            "POST",
            "/api/auth/login",
            r#"{"email":"not-an-email","password":"hunter22"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_login_requires_password() {
        let (status, _) = send(json_request(
            "POST",
            "/api/auth/login",
            r#"{"email":"meera@lustrejewels.in","password":""}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_without_session_succeeds() {
        let (status, _) = send(
            Request::post("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_category_has_no_single_record_route() {
        let (status, _) = send(
            Request::get("/api/categories/c-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
