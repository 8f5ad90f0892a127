//! The three-step checkout orchestrator.
//!
//! A [`CheckoutSession`] tracks which step the shopper is on
//! (address → shipping method → payment) and accumulates what each step
//! produced. Steps report back through [`CheckoutSession::continue_with`];
//! the final step asks for [`NextStep::PlaceOrder`], which validates the
//! accumulated form before any order request can be built.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartItem;
use crate::order::{OrderLine, OrderRequest, OrderTotals};
use crate::payment::{PaymentFlow, PaymentSelection};
use crate::shipping::{ShippingAddress, ShippingMethod};
use crate::types::{AddressId, OrderStatusId, UserId};

/// A checkout step. Only three exist, so the step can never leave 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CheckoutStep {
    #[default]
    Address = 1,
    Shipping = 2,
    Payment = 3,
}

/// A step number outside 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("checkout step must be 1, 2 or 3 (got {0})")]
pub struct InvalidStep(pub u8);

impl TryFrom<u8> for CheckoutStep {
    type Error = InvalidStep;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Address),
            2 => Ok(Self::Shipping),
            3 => Ok(Self::Payment),
            other => Err(InvalidStep(other)),
        }
    }
}

impl From<CheckoutStep> for u8 {
    fn from(step: CheckoutStep) -> Self {
        step as Self
    }
}

/// Where a step wants the checkout to go after recording its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Move to the given step.
    Step(CheckoutStep),
    /// Record the data and stay on the current step.
    Stay,
    /// Record the data and validate for order placement.
    PlaceOrder,
}

/// Data produced by a step. Absent fields leave the form unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub shipping_method: Option<ShippingMethod>,
    #[serde(default)]
    pub payment_method: Option<PaymentSelection>,
    #[serde(default)]
    pub order_notes: Option<String>,
}

impl StepData {
    #[must_use]
    pub fn address(address: ShippingAddress) -> Self {
        Self {
            shipping_address: Some(address),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn shipping(method: ShippingMethod) -> Self {
        Self {
            shipping_method: Some(method),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn payment(selection: PaymentSelection, notes: Option<String>) -> Self {
        Self {
            payment_method: Some(selection),
            order_notes: notes,
            ..Self::default()
        }
    }
}

/// Everything the steps have produced so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub shipping_address: Option<ShippingAddress>,
    pub shipping_method: Option<ShippingMethod>,
    pub payment_method: Option<PaymentSelection>,
    pub order_notes: String,
}

impl CheckoutForm {
    fn merge(&mut self, data: StepData) {
        if let Some(address) = data.shipping_address {
            // A different address invalidates the chosen method; the shipping
            // step re-selects one for the new location.
            if self.shipping_address.as_ref().and_then(ShippingAddress::saved_id)
                != address.saved_id()
            {
                self.shipping_method = None;
            }
            self.shipping_address = Some(address);
        }
        if let Some(method) = data.shipping_method {
            self.shipping_method = Some(method);
        }
        if let Some(payment) = data.payment_method {
            self.payment_method = Some(payment);
        }
        if let Some(notes) = data.order_notes {
            self.order_notes = notes.trim().to_owned();
        }
    }

    #[must_use]
    pub fn shipping_cost(&self) -> Decimal {
        self.shipping_method
            .as_ref()
            .map_or(Decimal::ZERO, |m| m.price)
    }
}

/// Why an order cannot be placed yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceOrderError {
    #[error("Please select a shipping address")]
    MissingShippingAddress,
    #[error("Please select a payment method")]
    MissingPaymentMethod,
    #[error("Your cart is empty")]
    EmptyCart,
}

impl PlaceOrderError {
    /// The step the shopper is sent back to, if any.
    #[must_use]
    pub const fn redirect_step(&self) -> Option<CheckoutStep> {
        match self {
            Self::MissingShippingAddress => Some(CheckoutStep::Address),
            Self::MissingPaymentMethod => Some(CheckoutStep::Payment),
            Self::EmptyCart => None,
        }
    }
}

/// Result of [`CheckoutSession::continue_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// The shopper moved to a new step.
    Advanced(CheckoutStep),
    /// Data was recorded; the step did not change.
    Recorded,
    /// The form is complete; an order may be placed.
    ReadyToPlace,
}

/// Inline validation messages, keyed by the step that shows them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutErrors {
    pub address: Option<String>,
    pub payment: Option<String>,
}

/// One shopper's checkout in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    current_step: CheckoutStep,
    form: CheckoutForm,
    errors: CheckoutErrors,
    /// Set when the step changed; the client scrolls to the top and clears it.
    scroll_to_top: bool,
    payment: PaymentFlow,
}

impl CheckoutSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current_step(&self) -> CheckoutStep {
        self.current_step
    }

    #[must_use]
    pub const fn form(&self) -> &CheckoutForm {
        &self.form
    }

    #[must_use]
    pub const fn errors(&self) -> &CheckoutErrors {
        &self.errors
    }

    #[must_use]
    pub const fn scroll_to_top(&self) -> bool {
        self.scroll_to_top
    }

    #[must_use]
    pub const fn payment(&self) -> &PaymentFlow {
        &self.payment
    }

    pub fn set_payment(&mut self, flow: PaymentFlow) {
        self.payment = flow;
    }

    /// Acknowledge a scroll request.
    pub fn take_scroll_to_top(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_top)
    }

    /// Record a step's data and move on.
    ///
    /// - `Step(n)` / `Stay` with `skip_step_update == false`: merge the data;
    ///   for `Step(n)` also move to `n` and request a scroll to top.
    /// - `Step(n)` / `Stay` with `skip_step_update == true`: merge the data
    ///   without moving (used when a step auto-selects a value).
    /// - `PlaceOrder`: merge, then require a saved shipping address and a
    ///   resolved payment method. On failure the matching inline error is set
    ///   and the shopper is moved to the step that can fix it.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceOrderError`] when `PlaceOrder` validation fails.
    pub fn continue_with(
        &mut self,
        data: StepData,
        next: NextStep,
        skip_step_update: bool,
    ) -> Result<ContinueOutcome, PlaceOrderError> {
        if data.shipping_address.is_some() {
            self.errors.address = None;
        }
        if data.payment_method.is_some() {
            self.errors.payment = None;
        }
        self.form.merge(data);

        match next {
            NextStep::PlaceOrder => self.validate_for_placement(),
            _ if skip_step_update => Ok(ContinueOutcome::Recorded),
            NextStep::Stay => Ok(ContinueOutcome::Recorded),
            NextStep::Step(step) => {
                self.go_to(step);
                Ok(ContinueOutcome::Advanced(step))
            }
        }
    }

    /// The shopper picked a payment label that matches no active method.
    ///
    /// Forgets any earlier selection, so a stale method can never be
    /// ordered with, and sends the shopper back to the payment step.
    pub fn reject_payment_selection(&mut self) -> PlaceOrderError {
        self.form.payment_method = None;
        let error = PlaceOrderError::MissingPaymentMethod;
        self.errors.payment = Some(error.to_string());
        self.go_to(CheckoutStep::Payment);
        error
    }

    /// Move to `step` directly (the shopper clicked an earlier step).
    pub fn go_to(&mut self, step: CheckoutStep) {
        if self.current_step != step {
            self.current_step = step;
            self.scroll_to_top = true;
        }
    }

    fn validate_for_placement(&mut self) -> Result<ContinueOutcome, PlaceOrderError> {
        let error = if self
            .form
            .shipping_address
            .as_ref()
            .and_then(ShippingAddress::saved_id)
            .is_none()
        {
            Some(PlaceOrderError::MissingShippingAddress)
        } else if self
            .form
            .payment_method
            .as_ref()
            .is_none_or(|p| p.method_id.is_blank())
        {
            Some(PlaceOrderError::MissingPaymentMethod)
        } else {
            None
        };

        match error {
            None => Ok(ContinueOutcome::ReadyToPlace),
            Some(error) => {
                match error {
                    PlaceOrderError::MissingShippingAddress => {
                        self.errors.address = Some(error.to_string());
                    }
                    PlaceOrderError::MissingPaymentMethod => {
                        self.errors.payment = Some(error.to_string());
                    }
                    PlaceOrderError::EmptyCart => {}
                }
                if let Some(step) = error.redirect_step() {
                    self.go_to(step);
                }
                Err(error)
            }
        }
    }

    /// Build the backend order request from the validated form.
    ///
    /// `lines` is the cart, or the single direct checkout item.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceOrderError`] if the form is incomplete or there is
    /// nothing to order. No request is produced in that case.
    pub fn build_order_request(
        &mut self,
        user: UserId,
        lines: &[CartItem],
        order_status: OrderStatusId,
        tax_percent: Decimal,
    ) -> Result<OrderRequest, PlaceOrderError> {
        self.validate_for_placement()?;
        if lines.is_empty() {
            return Err(PlaceOrderError::EmptyCart);
        }

        let (Some(address_id), Some(payment)) = (
            self.address_id().cloned(),
            self.form.payment_method.as_ref(),
        ) else {
            return Err(PlaceOrderError::MissingShippingAddress);
        };

        let totals = OrderTotals::compute(lines, self.form.shipping_cost(), tax_percent);

        Ok(OrderRequest {
            user,
            shipping_method: self.form.shipping_method.as_ref().map(|m| m.id.clone()),
            shipping_cost: totals.shipping,
            shipping_address: address_id,
            products: lines.iter().map(OrderLine::from).collect(),
            payment_method: payment.method_id.clone(),
            order_status,
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax: totals.tax,
            total: totals.total,
            comments: self.form.order_notes.clone(),
        })
    }

    fn address_id(&self) -> Option<&AddressId> {
        self.form
            .shipping_address
            .as_ref()
            .and_then(ShippingAddress::saved_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::tests::ring;
    use crate::payment::PaymentProvider;
    use crate::types::{PaymentMethodId, RecordStatus, ShippingMethodId};

    fn saved_address(id: &str) -> ShippingAddress {
        ShippingAddress {
            id: Some(AddressId::new(id)),
            full_name: "Asha Patel".to_string(),
            address: "12 Ring Road".to_string(),
            city: "Surat".to_string(),
            state: "Gujarat".to_string(),
            country: "India".to_string(),
            zip_code: "395003".to_string(),
            mobile_no: "9876543210".to_string(),
            ..ShippingAddress::default()
        }
    }

    fn surat_delivery() -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new("m-surat"),
            name: "Surat City Delivery".to_string(),
            price: Decimal::new(50, 0),
            status: RecordStatus::Active,
            description: None,
        }
    }

    fn cod() -> PaymentSelection {
        PaymentSelection {
            method_id: PaymentMethodId::new("pm-cod"),
            label: "Cash On Delivery".to_string(),
            provider: PaymentProvider::Offline,
        }
    }

    #[test]
    fn test_step_parse_rejects_out_of_range() {
        assert_eq!(CheckoutStep::try_from(0), Err(InvalidStep(0)));
        assert_eq!(CheckoutStep::try_from(4), Err(InvalidStep(4)));
        assert_eq!(CheckoutStep::try_from(2), Ok(CheckoutStep::Shipping));
        assert!(serde_json::from_str::<CheckoutStep>("7").is_err());
        assert_eq!(serde_json::to_string(&CheckoutStep::Payment).unwrap(), "3");
    }

    #[test]
    fn test_every_transition_stays_in_range() {
        let nexts = [
            NextStep::Stay,
            NextStep::PlaceOrder,
            NextStep::Step(CheckoutStep::Address),
            NextStep::Step(CheckoutStep::Shipping),
            NextStep::Step(CheckoutStep::Payment),
        ];
        let mut session = CheckoutSession::new();
        for (i, next) in nexts.iter().cycle().take(40).enumerate() {
            let data = match i % 4 {
                0 => StepData::address(saved_address("a1")),
                1 => StepData::shipping(surat_delivery()),
                2 => StepData::payment(cod(), None),
                _ => StepData::default(),
            };
            let _ = session.continue_with(data, *next, i % 3 == 0);
            let step = u8::from(session.current_step());
            assert!((1..=3).contains(&step));
        }
    }

    #[test]
    fn test_numeric_next_advances_and_requests_scroll() {
        let mut session = CheckoutSession::new();
        let outcome = session
            .continue_with(
                StepData::address(saved_address("a1")),
                NextStep::Step(CheckoutStep::Shipping),
                false,
            )
            .unwrap();
        assert_eq!(outcome, ContinueOutcome::Advanced(CheckoutStep::Shipping));
        assert_eq!(session.current_step(), CheckoutStep::Shipping);
        assert!(session.take_scroll_to_top());
        assert!(!session.scroll_to_top());
    }

    #[test]
    fn test_skip_step_update_records_without_moving() {
        let mut session = CheckoutSession::new();
        session.go_to(CheckoutStep::Shipping);
        let outcome = session
            .continue_with(
                StepData::shipping(surat_delivery()),
                NextStep::Step(CheckoutStep::Payment),
                true,
            )
            .unwrap();
        assert_eq!(outcome, ContinueOutcome::Recorded);
        assert_eq!(session.current_step(), CheckoutStep::Shipping);
        assert_eq!(session.form().shipping_cost(), Decimal::new(50, 0));
    }

    #[test]
    fn test_place_order_without_address_goes_to_step_one() {
        let mut session = CheckoutSession::new();
        session.go_to(CheckoutStep::Payment);
        let err = session
            .continue_with(StepData::payment(cod(), None), NextStep::PlaceOrder, false)
            .unwrap_err();
        assert_eq!(err, PlaceOrderError::MissingShippingAddress);
        assert_eq!(session.current_step(), CheckoutStep::Address);
        assert_eq!(
            session.errors().address.as_deref(),
            Some("Please select a shipping address")
        );
    }

    #[test]
    fn test_unsaved_address_blocks_placement() {
        let mut session = CheckoutSession::new();
        let mut address = saved_address("x");
        address.id = None;
        session
            .continue_with(StepData::address(address), NextStep::Stay, false)
            .unwrap();
        let err = session
            .build_order_request(
                UserId::new("u1"),
                &[ring(1)],
                OrderStatusId::new("st-pending"),
                Decimal::new(3, 0),
            )
            .unwrap_err();
        assert_eq!(err, PlaceOrderError::MissingShippingAddress);
    }

    #[test]
    fn test_place_order_without_payment_goes_to_step_three() {
        let mut session = CheckoutSession::new();
        session
            .continue_with(
                StepData::address(saved_address("a1")),
                NextStep::Step(CheckoutStep::Shipping),
                false,
            )
            .unwrap();
        let err = session
            .continue_with(StepData::default(), NextStep::PlaceOrder, false)
            .unwrap_err();
        assert_eq!(err, PlaceOrderError::MissingPaymentMethod);
        assert_eq!(session.current_step(), CheckoutStep::Payment);
        assert!(session.errors().payment.is_some());
        assert!(session.errors().address.is_none());
    }

    #[test]
    fn test_rejected_label_forgets_earlier_method() {
        let mut session = CheckoutSession::new();
        session
            .continue_with(
                StepData::address(saved_address("a1")),
                NextStep::Stay,
                false,
            )
            .unwrap();
        session
            .continue_with(StepData::payment(cod(), None), NextStep::Stay, false)
            .unwrap();

        let err = session.reject_payment_selection();
        assert_eq!(err, PlaceOrderError::MissingPaymentMethod);
        assert!(session.form().payment_method.is_none());
        assert_eq!(session.current_step(), CheckoutStep::Payment);

        let err = session
            .continue_with(StepData::default(), NextStep::PlaceOrder, false)
            .unwrap_err();
        assert_eq!(err, PlaceOrderError::MissingPaymentMethod);
    }

    #[test]
    fn test_complete_form_builds_request() {
        let mut session = CheckoutSession::new();
        session
            .continue_with(
                StepData::address(saved_address("a1")),
                NextStep::Step(CheckoutStep::Shipping),
                false,
            )
            .unwrap();
        session
            .continue_with(StepData::shipping(surat_delivery()), NextStep::Stay, true)
            .unwrap();
        let outcome = session
            .continue_with(
                StepData::payment(cod(), Some("  gift wrap please ".to_string())),
                NextStep::PlaceOrder,
                false,
            )
            .unwrap();
        assert_eq!(outcome, ContinueOutcome::ReadyToPlace);

        let request = session
            .build_order_request(
                UserId::new("u1"),
                &[ring(2)],
                OrderStatusId::new("st-pending"),
                Decimal::new(3, 0),
            )
            .unwrap();
        assert_eq!(request.shipping_address.as_str(), "a1");
        assert_eq!(request.payment_method.as_str(), "pm-cod");
        assert_eq!(request.shipping_cost, Decimal::new(50, 0));
        assert_eq!(request.total, Decimal::new(25_800, 0));
        assert_eq!(request.comments, "gift wrap please");
        assert_eq!(request.products.len(), 1);
    }

    #[test]
    fn test_empty_lines_rejected() {
        let mut session = CheckoutSession::new();
        session
            .continue_with(StepData::address(saved_address("a1")), NextStep::Stay, false)
            .unwrap();
        session
            .continue_with(StepData::payment(cod(), None), NextStep::Stay, false)
            .unwrap();
        let err = session
            .build_order_request(
                UserId::new("u1"),
                &[],
                OrderStatusId::new("st"),
                Decimal::ZERO,
            )
            .unwrap_err();
        assert_eq!(err, PlaceOrderError::EmptyCart);
        assert_eq!(err.redirect_step(), None);
    }

    #[test]
    fn test_changing_address_clears_method() {
        let mut session = CheckoutSession::new();
        session
            .continue_with(StepData::address(saved_address("a1")), NextStep::Stay, false)
            .unwrap();
        session
            .continue_with(StepData::shipping(surat_delivery()), NextStep::Stay, true)
            .unwrap();
        session
            .continue_with(StepData::address(saved_address("a1")), NextStep::Stay, false)
            .unwrap();
        assert!(session.form().shipping_method.is_some());
        session
            .continue_with(StepData::address(saved_address("a2")), NextStep::Stay, false)
            .unwrap();
        assert!(session.form().shipping_method.is_none());
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut session = CheckoutSession::new();
        session
            .continue_with(
                StepData::address(saved_address("a1")),
                NextStep::Step(CheckoutStep::Shipping),
                false,
            )
            .unwrap();
        let json = serde_json::to_string(&session).unwrap();
        let restored: CheckoutSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }
}
