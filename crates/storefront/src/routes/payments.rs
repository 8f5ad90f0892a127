//! Payment provider callbacks.
//!
//! PayPal sends the shopper's browser back to us, so its callbacks answer
//! with redirects. Razorpay's widget reports to the client, which posts the
//! signed fields here.

use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::RazorpayVerification;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::checkout::ORDER_SUCCESS_REDIRECT;
use crate::services::{CheckoutService, PlaceOrderResponse};
use crate::state::AppState;

const PAYMENT_CANCELLED_REDIRECT: &str = "/checkout?payment=cancelled";
const PAYMENT_FAILED_REDIRECT: &str = "/checkout?payment=failed";

/// Query PayPal appends to the return and cancel URLs.
#[derive(Debug, Deserialize)]
pub struct PaypalReturn {
    pub token: String,
}

/// PayPal approved the payment: place the order once.
#[instrument(skip(state, session, user, tokens, query), fields(user_id = %user.id))]
pub async fn paypal_success(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
    Query(query): Query<PaypalReturn>,
) -> Redirect {
    let service = CheckoutService::new(&state, &session);
    match service.complete_paypal(&user, &tokens, &query.token).await {
        Ok(_) => Redirect::to(ORDER_SUCCESS_REDIRECT),
        Err(e) => {
            tracing::error!(error = %e, "PayPal payment could not be completed");
            Redirect::to(PAYMENT_FAILED_REDIRECT)
        }
    }
}

/// The shopper backed out on PayPal.
#[instrument(skip(state, session, user, query), fields(user_id = %user.id))]
pub async fn paypal_cancel(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, _): RequireAuth,
    Query(query): Query<PaypalReturn>,
) -> Redirect {
    let service = CheckoutService::new(&state, &session);
    if let Err(e) = service.cancel_paypal(&user, &query.token).await {
        tracing::warn!(error = %e, "Failed to record PayPal cancellation");
    }
    Redirect::to(PAYMENT_CANCELLED_REDIRECT)
}

/// Verify the Razorpay widget result, then place the order.
#[instrument(skip(state, session, user, tokens, verification), fields(user_id = %user.id))]
pub async fn razorpay_verify(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
    Json(verification): Json<RazorpayVerification>,
) -> Result<Json<PlaceOrderResponse>> {
    let service = CheckoutService::new(&state, &session);
    let placed = service
        .verify_razorpay(&user, &tokens, &verification)
        .await?;
    Ok(Json(placed))
}
