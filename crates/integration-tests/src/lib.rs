//! Integration tests for Lustre.
//!
//! These run against live servers and a live commerce backend, so every
//! test is `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p lustre-cli -- migrate all
//! cargo run -p lustre-storefront &
//! cargo run -p lustre-admin &
//! cargo test -p lustre-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - default `http://localhost:3000`
//! - `ADMIN_BASE_URL` - default `http://localhost:3001`
//! - `TEST_ADMIN_EMAIL`, `TEST_ADMIN_PASSWORD` - backend admin account
//! - `TEST_CUSTOMER_EMAIL`, `TEST_CUSTOMER_PASSWORD` - backend customer account

use reqwest::Client;
use serde_json::{Value, json};

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the admin API.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Sign in to the storefront as a guest and return the client holding the
/// session.
///
/// # Panics
///
/// Panics if the storefront refuses the guest sign-in.
pub async fn guest_client() -> Client {
    let client = session_client();
    let resp = client
        .post(format!("{}/api/auth/guest", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert!(resp.status().is_success(), "guest sign-in failed: {}", resp.status());
    client
}

/// Sign in to the admin console with `TEST_ADMIN_EMAIL`/`TEST_ADMIN_PASSWORD`.
///
/// # Panics
///
/// Panics if the credentials are missing or rejected.
pub async fn admin_client() -> Client {
    let email = std::env::var("TEST_ADMIN_EMAIL").expect("TEST_ADMIN_EMAIL not set");
    let password = std::env::var("TEST_ADMIN_PASSWORD").expect("TEST_ADMIN_PASSWORD not set");

    let client = session_client();
    let resp = client
        .post(format!("{}/api/auth/login", admin_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to reach admin");
    assert!(resp.status().is_success(), "admin sign-in failed: {}", resp.status());
    client
}

/// The first active product in the storefront catalog.
///
/// # Panics
///
/// Panics if the catalog is empty.
pub async fn first_product_id(client: &Client) -> String {
    let products: Value = client
        .get(format!("{}/api/products?limit=1", storefront_base_url()))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");

    products
        .pointer("/products/0/_id")
        .and_then(Value::as_str)
        .map(String::from)
        .expect("Catalog has no products")
}
