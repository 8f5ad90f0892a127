//! Checkout steps and GST lookup against a running storefront.
//!
//! Run with: cargo test -p lustre-integration-tests -- --ignored

use lustre_integration_tests::{guest_client, session_client, storefront_base_url};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_addresses_need_sign_in() {
    let resp = session_client()
        .get(format!("{}/api/checkout/addresses", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "auth_required");
}

#[tokio::test]
#[ignore = "Requires running storefront server and commerce backend"]
async fn test_guest_starts_checkout_at_address_step() {
    let client = guest_client().await;
    let base_url = storefront_base_url();

    let checkout: Value = client
        .get(format!("{base_url}/api/checkout"))
        .send()
        .await
        .expect("Failed to get checkout")
        .json()
        .await
        .expect("Failed to parse checkout");
    assert_eq!(checkout["step"], 1);

    let resp = client
        .get(format!("{base_url}/api/checkout/addresses"))
        .send()
        .await
        .expect("Failed to list addresses");
    assert_eq!(resp.status(), StatusCode::OK);

    // Shipping needs an address first
    let resp = client
        .get(format!("{base_url}/api/checkout/shipping-methods"))
        .send()
        .await
        .expect("Failed to list shipping methods");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_cannot_skip_ahead_to_payment() {
    let resp = session_client()
        .post(format!("{}/api/checkout/step", storefront_base_url()))
        .json(&json!({ "step": 3 }))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_gst_checksum_rejected_locally() {
    let resp = session_client()
        .get(format!("{}/api/gst/24AAACC1206D1ZN", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and commerce backend"]
async fn test_gst_autofill_derives_state_and_pan() {
    let autofill: Value = session_client()
        .get(format!("{}/api/gst/27AAPFU0939F1ZV", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront")
        .json()
        .await
        .expect("Failed to parse autofill");

    assert_eq!(autofill["pancard"], "AAPFU0939F");
    assert_eq!(autofill["country"], "India");
}
