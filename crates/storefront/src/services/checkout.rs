//! Checkout orchestration.
//!
//! [`CheckoutService`] wraps the session-stored [`CheckoutSession`] with the
//! backend calls each step needs. The rules themselves (step movement,
//! placement validation, the payment state machine) live in `lustre_core`;
//! this service decides when to call the backend and what to persist.
//!
//! # Placing an order
//!
//! 1. The form is validated before anything touches the network.
//! 2. The `pending` order status is resolved. An empty status list is
//!    refreshed from the backend once.
//! 3. Totals are computed with the backend's tax rate and the order is
//!    created. No step is retried.
//! 4. On success the ordered lines and the checkout are dropped from the
//!    session and the client is told to navigate to `/orders`.
//!
//! Provider payments place the order that was priced before the shopper
//! paid. PayPal keeps that request in the database; Razorpay keeps it in the
//! session next to the open widget.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lustre_core::cart::CartItem;
use lustre_core::checkout::{CheckoutErrors, CheckoutForm, CheckoutSession, NextStep, StepData};
use lustre_core::order::{OrderRequest, OrderTotals};
use lustre_core::payment::{
    PaymentEvent, PaymentFlow, PaymentProvider, PaymentSelection, resolve_payment_method,
};
use lustre_core::shipping::{ShippingAddress, ShippingMethod};
use lustre_core::{CurrencyCode, OrderId, OrderStatusId, PendingPaymentStatus, Price};

use super::cart::{checkout_lines, clear_ordered_lines};
use crate::backend::{
    BackendError, PaymentProcessRequest, RazorpayVerification, pending_status,
};
use crate::db::pending_payments::{self, NewPendingPayment};
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::guard_auth;
use crate::models::{CurrentUser, SessionTokens, session_keys};
use crate::state::AppState;

/// Razorpay's hosted checkout script.
pub const RAZORPAY_SCRIPT_URL: &str = "https://checkout.razorpay.com/v1/checkout.js";

/// Where the client goes after a successful order.
pub const ORDER_SUCCESS_REDIRECT: &str = "/orders";

/// Delay before that navigation, so the success toast is seen.
pub const ORDER_SUCCESS_REDIRECT_MS: u64 = 1200;

const PAYPAL: &str = "PAYPAL";
const RAZORPAY: &str = "RAZORPAY";

static STOCK_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)insufficient\s+stock|out\s+of\s+stock|only\s+\d+\s+(?:\w+\s+)?left")
        .expect("Invalid regex")
});

/// Whether a backend message reports missing stock.
#[must_use]
pub fn is_stock_error(message: &str) -> bool {
    STOCK_ERROR_RE.is_match(message)
}

// =============================================================================
// Responses
// =============================================================================

/// JSON view of the checkout in progress.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub step: u8,
    pub scroll_to_top: bool,
    pub form: CheckoutForm,
    pub errors: CheckoutErrors,
    pub payment_state: &'static str,
    pub lines: Vec<CartItem>,
    pub totals: OrderTotals,
}

/// Tells the client an order was placed.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub toast: String,
    pub order_id: Option<OrderId>,
    pub redirect: &'static str,
    pub redirect_after_ms: u64,
}

impl PlaceOrderResponse {
    fn placed(order_id: Option<OrderId>) -> Self {
        Self {
            success: true,
            toast: "Order placed successfully".to_string(),
            order_id,
            redirect: ORDER_SUCCESS_REDIRECT,
            redirect_after_ms: ORDER_SUCCESS_REDIRECT_MS,
        }
    }
}

/// What the client does after submitting the payment step.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The order exists; show the toast and navigate.
    OrderPlaced(PlaceOrderResponse),
    /// Send the browser to the provider.
    Redirect { redirect_url: String },
    /// Load the Razorpay script and open its widget.
    OpenRazorpay {
        script_url: &'static str,
        key: String,
        order_id: String,
        amount: u64,
        currency: String,
    },
}

/// The order behind an open Razorpay widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RazorpayOrder {
    provider_order_id: String,
    request: OrderRequest,
}

// =============================================================================
// CheckoutService
// =============================================================================

/// Checkout operations for one shopper's session.
pub struct CheckoutService<'a> {
    state: &'a AppState,
    session: &'a Session,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState, session: &'a Session) -> Self {
        Self { state, session }
    }

    /// The checkout in progress, or a fresh one at step 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(&self) -> Result<CheckoutSession, AppError> {
        Ok(self
            .session
            .get(session_keys::CHECKOUT)
            .await?
            .unwrap_or_default())
    }

    /// Persist the checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save(&self, checkout: &CheckoutSession) -> Result<(), AppError> {
        self.session.insert(session_keys::CHECKOUT, checkout).await?;
        Ok(())
    }

    /// Build the JSON view, consuming the scroll request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn view(&self, checkout: &mut CheckoutSession) -> Result<CheckoutView, AppError> {
        let lines = checkout_lines(self.session).await?;
        let totals = OrderTotals::compute(
            &lines,
            checkout.form().shipping_cost(),
            self.tax_percent().await,
        );
        let scroll_to_top = checkout.take_scroll_to_top();
        self.save(checkout).await?;

        Ok(CheckoutView {
            step: checkout.current_step().into(),
            scroll_to_top,
            form: checkout.form().clone(),
            errors: checkout.errors().clone(),
            payment_state: checkout.payment().name(),
            lines,
            totals,
        })
    }

    /// Record the chosen address in the soft cache between steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn remember_address(&self, address: &ShippingAddress) -> Result<(), AppError> {
        if let Some(id) = address.saved_id() {
            self.session
                .insert(session_keys::SELECTED_SHIPPING_ADDRESS, id)
                .await?;
        }
        Ok(())
    }

    /// Record the chosen method in the soft cache between steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn remember_method(&self, method: &ShippingMethod) -> Result<(), AppError> {
        self.session
            .insert(session_keys::SELECTED_SHIPPING_METHOD, &method.id)
            .await?;
        Ok(())
    }

    /// Tax rate from the backend settings, or the configured default.
    ///
    /// A settings outage must not block checkout, so failures fall back to
    /// the default.
    pub async fn tax_percent(&self) -> Decimal {
        let default = self.state.config().checkout.default_tax_percent;
        match self.state.backend().settings().await {
            Ok(settings) => settings
                .tax_rate
                .filter(|rate| !rate.is_sign_negative())
                .unwrap_or(default),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load settings, using default tax rate");
                default
            }
        }
    }

    /// ID of the `pending` order status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the backend has no such status.
    pub async fn pending_status_id(&self) -> Result<OrderStatusId, AppError> {
        let backend = self.state.backend();
        let mut statuses = backend.order_statuses(false).await?;
        if statuses.is_empty() {
            tracing::debug!("Order status list empty, refreshing");
            statuses = backend.order_statuses(true).await?;
        }

        pending_status(&statuses)
            .map(|status| status.id.clone())
            .ok_or_else(|| AppError::Internal("no pending order status configured".to_string()))
    }

    /// Validate the form and build the order request.
    ///
    /// Validation runs before any backend call; a rejected form is saved
    /// (with its inline error and step jump) and returned as an error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkout` when the form is incomplete or there is
    /// nothing to order, or a backend error from the status lookup.
    pub async fn build_order_request(
        &self,
        checkout: &mut CheckoutSession,
        user: &CurrentUser,
    ) -> Result<OrderRequest, AppError> {
        if let Err(e) = checkout.continue_with(StepData::default(), NextStep::PlaceOrder, false) {
            self.save(checkout).await?;
            return Err(e.into());
        }

        let lines = checkout_lines(self.session).await?;
        if lines.is_empty() {
            return Err(lustre_core::checkout::PlaceOrderError::EmptyCart.into());
        }

        let status = self.pending_status_id().await?;
        let tax = self.tax_percent().await;
        checkout
            .build_order_request(user.id.clone(), &lines, status, tax)
            .map_err(AppError::from)
    }

    // =========================================================================
    // Payment step
    // =========================================================================

    /// Submit the payment step.
    ///
    /// Resolves the chosen label, validates the form and then branches by
    /// provider: offline methods place the order now, PayPal returns a
    /// redirect, Razorpay returns widget parameters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkout` for an unknown method or incomplete form,
    /// `AppError::PaymentFlow` while another submission is in flight,
    /// `AppError::Provider` if the provider order cannot be created, and
    /// order placement errors for offline methods.
    #[instrument(skip(self, user, tokens, notes), fields(user_id = %user.id))]
    pub async fn submit_payment(
        &self,
        user: &CurrentUser,
        tokens: &SessionTokens,
        label: &str,
        notes: Option<String>,
    ) -> Result<PaymentOutcome, AppError> {
        let mut checkout = self.load().await?;

        let methods = self.state.backend().payment_methods().await?;
        let Some(selection) = resolve_payment_method(&methods, label) else {
            let err = checkout.reject_payment_selection();
            self.save(&checkout).await?;
            return Err(err.into());
        };

        let flow = checkout
            .payment()
            .apply(PaymentEvent::SelectMethod(selection.provider))?;
        checkout.set_payment(flow);

        let provider = selection.provider;
        if let Err(e) = checkout.continue_with(
            StepData::payment(selection.clone(), notes),
            NextStep::PlaceOrder,
            false,
        ) {
            self.save(&checkout).await?;
            return Err(e.into());
        }

        add_breadcrumb(
            "checkout",
            "Payment method selected",
            Some(&[("method", selection.label.as_str())]),
        );

        let request = self.build_order_request(&mut checkout, user).await?;

        match provider {
            PaymentProvider::Offline => {
                let flow = checkout.payment().apply(PaymentEvent::SubmitDirect)?;
                checkout.set_payment(flow);
                self.save(&checkout).await?;
                let placed = self.submit_order(&mut checkout, tokens, &request).await?;
                Ok(PaymentOutcome::OrderPlaced(placed))
            }
            PaymentProvider::PayPal => {
                self.start_paypal(&mut checkout, user, tokens, &request)
                    .await
            }
            PaymentProvider::Razorpay => {
                self.start_razorpay(&mut checkout, tokens, &selection, &request)
                    .await
            }
        }
    }

    async fn start_paypal(
        &self,
        checkout: &mut CheckoutSession,
        user: &CurrentUser,
        tokens: &SessionTokens,
        request: &OrderRequest,
    ) -> Result<PaymentOutcome, AppError> {
        let config = self.state.config();
        let body = PaymentProcessRequest {
            amount: request.total,
            currency: CurrencyCode::INR.code(),
            return_url: Some(config.absolute_url("/checkout/paypal/success")),
            cancel_url: Some(config.absolute_url("/checkout/paypal/cancel")),
        };

        let result = self
            .state
            .backend()
            .process_payment(&tokens.access_token, PAYPAL, &body)
            .await;
        let response = self.provider_result(checkout, result).await?;

        let (Some(approval_url), Some(reference)) = (response.approval_url, response.order_id)
        else {
            return Err(self
                .fail(checkout, "PayPal did not return an approval link")
                .await);
        };

        pending_payments::create_pending_payment(
            self.state.pool(),
            NewPendingPayment {
                provider: PAYPAL,
                provider_reference: &reference,
                user_id: &user.id,
                order_request: request,
            },
        )
        .await?;

        let flow = checkout
            .payment()
            .apply(PaymentEvent::RedirectToPaypal { reference })?;
        checkout.set_payment(flow);
        self.save(checkout).await?;

        tracing::info!("Redirecting shopper to PayPal");
        Ok(PaymentOutcome::Redirect {
            redirect_url: approval_url,
        })
    }

    async fn start_razorpay(
        &self,
        checkout: &mut CheckoutSession,
        tokens: &SessionTokens,
        selection: &PaymentSelection,
        request: &OrderRequest,
    ) -> Result<PaymentOutcome, AppError> {
        let body = PaymentProcessRequest {
            amount: request.total,
            currency: CurrencyCode::INR.code(),
            return_url: None,
            cancel_url: None,
        };

        let result = self
            .state
            .backend()
            .process_payment(&tokens.access_token, RAZORPAY, &body)
            .await;
        let response = self.provider_result(checkout, result).await?;

        let key = response
            .key
            .or_else(|| self.state.config().checkout.razorpay_key_id.clone());
        let (Some(key), Some(order_id)) = (key, response.order_id) else {
            return Err(self.fail(checkout, "Razorpay is not available").await);
        };

        let amount = response.amount.unwrap_or_else(|| {
            u64::try_from(Price::inr(request.total).minor_units()).unwrap_or_default()
        });

        let flow = checkout.payment().apply(PaymentEvent::OpenRazorpay {
            provider_order_id: order_id.clone(),
        })?;
        checkout.set_payment(flow);
        self.session
            .insert(
                session_keys::RAZORPAY_ORDER,
                RazorpayOrder {
                    provider_order_id: order_id.clone(),
                    request: request.clone(),
                },
            )
            .await?;
        self.save(checkout).await?;

        tracing::info!(method = %selection.label, "Opening Razorpay widget");
        Ok(PaymentOutcome::OpenRazorpay {
            script_url: RAZORPAY_SCRIPT_URL,
            key,
            order_id,
            amount,
            currency: response
                .currency
                .unwrap_or_else(|| CurrencyCode::INR.code().to_string()),
        })
    }

    /// Verify a Razorpay payment and place the order.
    ///
    /// The order placed is the one priced when the widget opened, whatever
    /// the cart holds now.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the payment is not for this
    /// checkout's open widget, `AppError::Provider` if verification fails,
    /// and order placement errors otherwise.
    #[instrument(skip(self, user, tokens, verification), fields(user_id = %user.id))]
    pub async fn verify_razorpay(
        &self,
        user: &CurrentUser,
        tokens: &SessionTokens,
        verification: &RazorpayVerification,
    ) -> Result<PlaceOrderResponse, AppError> {
        let mut checkout = self.load().await?;
        let snapshot: Option<RazorpayOrder> =
            self.session.get(session_keys::RAZORPAY_ORDER).await?;

        let request = match (checkout.payment(), snapshot) {
            (PaymentFlow::RazorpayWidgetOpen { provider_order_id }, Some(snapshot))
                if *provider_order_id == verification.razorpay_order_id
                    && snapshot.provider_order_id == verification.razorpay_order_id =>
            {
                snapshot.request
            }
            _ => {
                return Err(AppError::BadRequest(
                    "This payment does not belong to the current checkout".to_string(),
                ));
            }
        };

        let result = self
            .state
            .backend()
            .verify_razorpay(&tokens.access_token, verification)
            .await;
        self.provider_result(&mut checkout, result).await?;

        let flow = checkout.payment().apply(PaymentEvent::PaymentVerified)?;
        checkout.set_payment(flow);
        self.save(&checkout).await?;

        tracing::info!("Razorpay payment verified");
        self.submit_order(&mut checkout, tokens, &request).await
    }

    /// Place the order approved at PayPal.
    ///
    /// The order is built from the snapshot taken before the redirect. A
    /// repeated callback for an already completed payment returns the same
    /// success without creating another order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if there is no payment for this token,
    /// and order placement errors otherwise. If the backend rejects the
    /// order the payment returns to `pending` so the callback can be
    /// retried. Once an order exists the payment stays completed.
    #[instrument(skip(self, user, tokens), fields(user_id = %user.id))]
    pub async fn complete_paypal(
        &self,
        user: &CurrentUser,
        tokens: &SessionTokens,
        token: &str,
    ) -> Result<PlaceOrderResponse, AppError> {
        let pool = self.state.pool();

        let Some(payment) =
            pending_payments::claim_pending_payment(pool, PAYPAL, token, &user.id).await?
        else {
            return match pending_payments::get_pending_payment(pool, PAYPAL, token).await? {
                Some(existing)
                    if existing.user_id == user.id
                        && existing.status == PendingPaymentStatus::Completed =>
                {
                    tracing::info!("PayPal callback repeated for a completed payment");
                    Ok(PlaceOrderResponse::placed(existing.backend_order_id))
                }
                _ => Err(AppError::NotFound(
                    "No pending PayPal payment for this token".to_string(),
                )),
            };
        };

        let mut checkout = self.load().await?;
        // The stored snapshot is authoritative even if this session's flow
        // was reset (for example by a second tab).
        let flow = checkout
            .payment()
            .apply(PaymentEvent::PaymentVerified)
            .unwrap_or(PaymentFlow::DirectSubmit);
        checkout.set_payment(flow);

        let order_id = match self
            .create_order(&mut checkout, tokens, &payment.order_request)
            .await
        {
            Ok(order_id) => order_id,
            Err(e) => {
                pending_payments::release_pending_payment(pool, payment.id).await?;
                return Err(e);
            }
        };

        if let Some(order_id) = &order_id {
            pending_payments::record_backend_order(pool, payment.id, order_id).await?;
        }
        self.finish().await?;
        Ok(PlaceOrderResponse::placed(order_id))
    }

    /// The shopper cancelled at PayPal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or session store fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn cancel_paypal(&self, user: &CurrentUser, token: &str) -> Result<(), AppError> {
        match pending_payments::cancel_pending_payment(self.state.pool(), PAYPAL, token, &user.id)
            .await
        {
            Ok(()) => tracing::info!("PayPal payment cancelled by shopper"),
            Err(crate::db::RepositoryError::NotFound) => {
                tracing::debug!("No pending PayPal payment to cancel");
            }
            Err(e) => return Err(e.into()),
        }

        let mut checkout = self.load().await?;
        if let Ok(flow) = checkout.payment().apply(PaymentEvent::Fail {
            reason: "Payment cancelled".to_string(),
        }) {
            checkout.set_payment(flow);
        }
        checkout.go_to(lustre_core::checkout::CheckoutStep::Payment);
        self.save(&checkout).await
    }

    // =========================================================================
    // Order submission
    // =========================================================================

    /// Create the order and clean up the session.
    async fn submit_order(
        &self,
        checkout: &mut CheckoutSession,
        tokens: &SessionTokens,
        request: &OrderRequest,
    ) -> Result<PlaceOrderResponse, AppError> {
        let order_id = self.create_order(checkout, tokens, request).await?;
        self.finish().await?;
        Ok(PlaceOrderResponse::placed(order_id))
    }

    /// Create the order at the backend.
    ///
    /// A rejection fails the payment flow and is saved; a stock message
    /// becomes `AppError::OutOfStock`.
    async fn create_order(
        &self,
        checkout: &mut CheckoutSession,
        tokens: &SessionTokens,
        request: &OrderRequest,
    ) -> Result<Option<OrderId>, AppError> {
        let result = self
            .state
            .backend()
            .create_order(&tokens.access_token, request)
            .await;

        match result {
            Ok(created) => {
                tracing::info!(order_id = ?created.id, total = %request.total, "Order placed");
                if let Ok(flow) = checkout.payment().apply(PaymentEvent::OrderCreated {
                    order_id: created.id.clone(),
                }) {
                    checkout.set_payment(flow);
                }
                Ok(created.id)
            }
            Err(err) => {
                let reason = err
                    .backend_message()
                    .unwrap_or("Order could not be placed")
                    .to_string();
                if let Ok(flow) = checkout.payment().apply(PaymentEvent::Fail {
                    reason: reason.clone(),
                }) {
                    checkout.set_payment(flow);
                }
                self.save(checkout).await?;

                if is_stock_error(&reason) {
                    return Err(AppError::OutOfStock(reason));
                }
                guard_auth(self.session, Err(err)).await
            }
        }
    }

    /// Drop everything the finished checkout kept in the session.
    async fn finish(&self) -> Result<(), AppError> {
        clear_ordered_lines(self.session).await?;
        self.session
            .remove::<CheckoutSession>(session_keys::CHECKOUT)
            .await?;
        self.session
            .remove::<serde_json::Value>(session_keys::SELECTED_SHIPPING_ADDRESS)
            .await?;
        self.session
            .remove::<serde_json::Value>(session_keys::SELECTED_SHIPPING_METHOD)
            .await?;
        self.session
            .remove::<serde_json::Value>(session_keys::RAZORPAY_ORDER)
            .await?;
        Ok(())
    }

    /// Map a provider call result, failing the payment flow on error.
    async fn provider_result<T>(
        &self,
        checkout: &mut CheckoutSession,
        result: Result<T, BackendError>,
    ) -> Result<T, AppError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_unauthorized() => guard_auth(self.session, Err(err)).await,
            Err(err) => {
                tracing::warn!(error = %err, "Payment provider call failed");
                let message = err
                    .backend_message()
                    .unwrap_or("Payment could not be processed")
                    .to_string();
                Err(self.fail(checkout, &message).await)
            }
        }
    }

    /// Move the payment flow to `Failed` and build the client error.
    async fn fail(&self, checkout: &mut CheckoutSession, reason: &str) -> AppError {
        if let Ok(flow) = checkout.payment().apply(PaymentEvent::Fail {
            reason: reason.to_string(),
        }) {
            checkout.set_payment(flow);
        }
        if let Err(e) = self.save(checkout).await {
            return e;
        }
        AppError::Provider(reason.to_string())
    }
}
