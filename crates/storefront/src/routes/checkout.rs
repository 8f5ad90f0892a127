//! Checkout step route handlers.
//!
//! Each handler loads the [`CheckoutSession`] from the session store, feeds
//! the step's data through `continue_with`, saves it back and returns the
//! refreshed [`CheckoutView`]. Validation failures come back as 422 with the
//! step the client should show.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lustre_core::checkout::{CheckoutSession, CheckoutStep, NextStep, PlaceOrderError, StepData};
use lustre_core::gst::Gstin;
use lustre_core::payment::PaymentMethod;
use lustre_core::shipping::{ShippingAddress, ShippingMethod, applicable_methods, preselect_address};
use lustre_core::{AddressId, ShippingMethodId};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, guard_auth};
use crate::models::session_keys;
use crate::services::cart::clear_direct_item;
use crate::services::{CheckoutService, CheckoutView, PaymentOutcome};
use crate::state::AppState;

/// Shown when the location heuristic leaves nothing to pick.
pub const NO_SHIPPING_METHODS: &str = "No shipping methods available for this address";

/// Saved addresses with the one to pre-select.
#[derive(Debug, Serialize)]
pub struct AddressList {
    pub addresses: Vec<ShippingAddress>,
    pub selected_id: Option<AddressId>,
}

/// Body of `POST /api/checkout/address`.
#[derive(Debug, Deserialize)]
pub struct SelectAddressForm {
    pub address_id: AddressId,
}

/// Shipping methods for the chosen address.
#[derive(Debug, Serialize)]
pub struct ShippingMethodList {
    pub methods: Vec<ShippingMethod>,
    pub selected_id: Option<ShippingMethodId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Body of `POST /api/checkout/shipping-method`.
#[derive(Debug, Deserialize)]
pub struct SelectShippingMethodForm {
    pub method_id: ShippingMethodId,
}

/// Body of `POST /api/checkout/step`.
#[derive(Debug, Deserialize)]
pub struct GoToStepForm {
    pub step: u8,
}

/// Body of `POST /api/checkout/payment`.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub method: String,
    #[serde(default)]
    pub order_notes: Option<String>,
}

/// The checkout as the client renders it.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutView>> {
    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;
    Ok(Json(service.view(&mut checkout).await?))
}

/// Begin checking out the cart, ending any "buy now" flow.
#[instrument(skip(state, session))]
pub async fn start(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutView>> {
    clear_direct_item(&session).await?;
    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;
    Ok(Json(service.view(&mut checkout).await?))
}

/// Jump back to an earlier step. Moving forward goes through the step
/// handlers so their data is recorded.
#[instrument(skip(state, session))]
pub async fn go_to_step(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<GoToStepForm>,
) -> Result<Json<CheckoutView>> {
    let step = CheckoutStep::try_from(form.step).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;
    if step > checkout.current_step() {
        return Err(AppError::BadRequest(
            "Complete the current step first".to_string(),
        ));
    }
    checkout.go_to(step);
    Ok(Json(service.view(&mut checkout).await?))
}

// =============================================================================
// Step 1: Shipping address
// =============================================================================

/// Saved addresses, with the pre-selected one.
#[instrument(skip(state, session, user, tokens), fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
) -> Result<Json<AddressList>> {
    let addresses = guard_auth(
        &session,
        state.backend().addresses(&tokens.access_token).await,
    )
    .await?;

    let explicit: Option<AddressId> = session.get(session_keys::SELECTED_SHIPPING_ADDRESS).await?;
    let selected_id = preselect_address(&addresses, explicit.as_ref())
        .and_then(ShippingAddress::saved_id)
        .cloned();

    Ok(Json(AddressList {
        addresses,
        selected_id,
    }))
}

/// Save a new address and select it.
#[instrument(skip(state, session, user, tokens, address), fields(user_id = %user.id))]
pub async fn add_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
    Json(mut address): Json<ShippingAddress>,
) -> Result<(StatusCode, Json<CheckoutView>)> {
    let missing = address.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    address.gst = match address.gst.as_deref().map(str::trim) {
        Some(gst) if !gst.is_empty() => Some(Gstin::parse(gst)?.to_string()),
        _ => None,
    };
    address.id = None;

    let created = guard_auth(
        &session,
        state
            .backend()
            .add_address(&tokens.access_token, &address)
            .await,
    )
    .await?;
    if created.saved_id().is_none() {
        return Err(AppError::Internal(
            "backend returned an address without an id".to_string(),
        ));
    }

    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;
    checkout.continue_with(StepData::address(created.clone()), NextStep::Stay, false)?;
    service.remember_address(&created).await?;

    tracing::info!("Shipping address added");
    Ok((StatusCode::CREATED, Json(service.view(&mut checkout).await?)))
}

/// Use a saved address and move to the shipping step.
#[instrument(skip(state, session, user, tokens), fields(user_id = %user.id))]
pub async fn select_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
    Json(form): Json<SelectAddressForm>,
) -> Result<Json<CheckoutView>> {
    let addresses = guard_auth(
        &session,
        state.backend().addresses(&tokens.access_token).await,
    )
    .await?;

    let address = addresses
        .into_iter()
        .find(|a| a.saved_id() == Some(&form.address_id))
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;
    service.remember_address(&address).await?;
    checkout.continue_with(
        StepData::address(address),
        NextStep::Step(CheckoutStep::Shipping),
        false,
    )?;

    Ok(Json(service.view(&mut checkout).await?))
}

// =============================================================================
// Step 2: Shipping method
// =============================================================================

/// Methods that deliver to the chosen address, cheapest first.
async fn methods_for(
    state: &AppState,
    checkout: &mut CheckoutSession,
) -> Result<Vec<ShippingMethod>> {
    let Some(address) = checkout.form().shipping_address.clone() else {
        checkout.go_to(CheckoutStep::Address);
        return Err(PlaceOrderError::MissingShippingAddress.into());
    };
    let methods = state.backend().shipping_methods().await?;
    Ok(applicable_methods(&address, &methods))
}

/// Shipping methods for the chosen address.
///
/// The current choice is kept while it still applies; otherwise the
/// cheapest method is selected without leaving the step.
#[instrument(skip(state, session))]
pub async fn shipping_methods(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ShippingMethodList>> {
    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;

    let methods = match methods_for(&state, &mut checkout).await {
        Ok(methods) => methods,
        Err(e) => {
            service.save(&checkout).await?;
            return Err(e);
        }
    };

    let current = checkout
        .form()
        .shipping_method
        .as_ref()
        .and_then(|chosen| methods.iter().find(|m| m.id == chosen.id))
        .or_else(|| methods.first())
        .cloned();

    let selected_id = match current {
        Some(method) => {
            let id = method.id.clone();
            service.remember_method(&method).await?;
            checkout.continue_with(StepData::shipping(method), NextStep::Stay, true)?;
            Some(id)
        }
        None => {
            tracing::info!("No shipping method applies to the chosen address");
            None
        }
    };
    service.save(&checkout).await?;

    let message = methods.is_empty().then_some(NO_SHIPPING_METHODS);
    Ok(Json(ShippingMethodList {
        methods,
        selected_id,
        message,
    }))
}

/// Choose a shipping method and move to the payment step.
#[instrument(skip(state, session))]
pub async fn select_shipping_method(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SelectShippingMethodForm>,
) -> Result<Json<CheckoutView>> {
    let service = CheckoutService::new(&state, &session);
    let mut checkout = service.load().await?;

    let methods = match methods_for(&state, &mut checkout).await {
        Ok(methods) => methods,
        Err(e) => {
            service.save(&checkout).await?;
            return Err(e);
        }
    };

    let method = methods
        .into_iter()
        .find(|m| m.id == form.method_id)
        .ok_or_else(|| {
            AppError::Validation(
                "This shipping method is not available for your address".to_string(),
            )
        })?;

    service.remember_method(&method).await?;
    checkout.continue_with(
        StepData::shipping(method),
        NextStep::Step(CheckoutStep::Payment),
        false,
    )?;

    Ok(Json(service.view(&mut checkout).await?))
}

// =============================================================================
// Step 3: Payment
// =============================================================================

/// Active payment methods.
#[instrument(skip(state))]
pub async fn payment_methods(State(state): State<AppState>) -> Result<Json<Vec<PaymentMethod>>> {
    let methods = state.backend().payment_methods().await?;
    Ok(Json(
        methods
            .iter()
            .filter(|m| m.status.is_active())
            .cloned()
            .collect(),
    ))
}

/// Pay and place the order.
///
/// Offline methods place the order right away. PayPal answers with a
/// redirect; Razorpay with the widget parameters.
#[instrument(skip(state, session, user, tokens, form), fields(user_id = %user.id, method = %form.method))]
pub async fn submit_payment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user, tokens): RequireAuth,
    Json(form): Json<PaymentForm>,
) -> Result<Json<PaymentOutcome>> {
    let service = CheckoutService::new(&state, &session);
    let outcome = service
        .submit_payment(&user, &tokens, &form.method, form.order_notes)
        .await?;
    Ok(Json(outcome))
}
