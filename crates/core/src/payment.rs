//! Payment methods and the payment sub-flow state machine.
//!
//! ```text
//!            select                 redirect
//! Idle ──────────────► MethodSelected ────────► PaypalRedirect ──┐
//!                           │  │       open                      │ verified
//!                           │  └─────────────► RazorpayWidgetOpen┤
//!                           │ submit                             ▼
//!                           └─────────────────────────────► DirectSubmit
//!                                                                │ created
//!                         any non-terminal ── fail ──► Failed    ▼
//!                                                           OrderPlaced
//! ```
//!
//! Only one operation is in flight per checkout: while in `DirectSubmit` the
//! order request has been sent and a new selection is refused.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OrderId, PaymentMethodId, RecordStatus};

/// A payment method configured in the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "_id")]
    pub id: PaymentMethodId,
    pub name: String,
    #[serde(default)]
    pub status: RecordStatus,
}

/// How a payment method is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    /// Redirect to PayPal; the order is created on the success callback.
    PayPal,
    /// Embedded Razorpay widget; the order is created after verification.
    Razorpay,
    /// Offline methods such as cash on delivery or bank transfer.
    Offline,
}

impl PaymentProvider {
    /// Provider for a method label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.contains("paypal") {
            Self::PayPal
        } else if label.contains("razorpay") {
            Self::Razorpay
        } else {
            Self::Offline
        }
    }

    /// Path segment used by the backend payment processing endpoint.
    #[must_use]
    pub const fn backend_code(self) -> Option<&'static str> {
        match self {
            Self::PayPal => Some("PAYPAL"),
            Self::Razorpay => Some("RAZORPAY"),
            Self::Offline => None,
        }
    }
}

/// A payment method the shopper picked, with its backend ID resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSelection {
    pub method_id: PaymentMethodId,
    pub label: String,
    pub provider: PaymentProvider,
}

/// Resolve a label (method name, or ID) to an active payment method.
///
/// Names are compared case-insensitively after trimming.
#[must_use]
pub fn resolve_payment_method(methods: &[PaymentMethod], label: &str) -> Option<PaymentSelection> {
    let wanted = label.trim();
    if wanted.is_empty() {
        return None;
    }
    methods
        .iter()
        .filter(|m| m.status.is_active())
        .find(|m| m.name.trim().eq_ignore_ascii_case(wanted) || m.id.as_str() == wanted)
        .map(|m| PaymentSelection {
            method_id: m.id.clone(),
            label: m.name.clone(),
            provider: PaymentProvider::from_label(&m.name),
        })
}

/// State of the payment step for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentFlow {
    #[default]
    Idle,
    MethodSelected { provider: PaymentProvider },
    PaypalRedirect { reference: String },
    RazorpayWidgetOpen { provider_order_id: String },
    DirectSubmit,
    OrderPlaced { order_id: Option<OrderId> },
    Failed { reason: String },
}

/// Something that happened on the payment step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    SelectMethod(PaymentProvider),
    RedirectToPaypal { reference: String },
    OpenRazorpay { provider_order_id: String },
    /// The provider confirmed the payment (PayPal success callback or
    /// Razorpay server-side verification).
    PaymentVerified,
    SubmitDirect,
    OrderCreated { order_id: Option<OrderId> },
    Fail { reason: String },
}

impl PaymentEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::SelectMethod(_) => "select_method",
            Self::RedirectToPaypal { .. } => "redirect_to_paypal",
            Self::OpenRazorpay { .. } => "open_razorpay",
            Self::PaymentVerified => "payment_verified",
            Self::SubmitDirect => "submit_direct",
            Self::OrderCreated { .. } => "order_created",
            Self::Fail { .. } => "fail",
        }
    }
}

/// A payment event that is not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentFlowError {
    #[error("an order submission is already in progress")]
    InFlight,
    #[error("the order has already been placed")]
    AlreadyPlaced,
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

impl PaymentFlow {
    /// Short name of the state, for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MethodSelected { .. } => "method_selected",
            Self::PaypalRedirect { .. } => "paypal_redirect",
            Self::RazorpayWidgetOpen { .. } => "razorpay_widget_open",
            Self::DirectSubmit => "direct_submit",
            Self::OrderPlaced { .. } => "order_placed",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::OrderPlaced { .. })
    }

    /// Apply an event, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentFlowError`] if the event is not allowed now; the
    /// current state should be kept in that case.
    pub fn apply(&self, event: PaymentEvent) -> Result<Self, PaymentFlowError> {
        if self.is_terminal() {
            return Err(PaymentFlowError::AlreadyPlaced);
        }

        let invalid = PaymentFlowError::InvalidTransition {
            state: self.name(),
            event: event.name(),
        };

        match (self, event) {
            (Self::DirectSubmit, PaymentEvent::SelectMethod(_) | PaymentEvent::SubmitDirect) => {
                Err(PaymentFlowError::InFlight)
            }
            (_, PaymentEvent::SelectMethod(provider)) => Ok(Self::MethodSelected { provider }),
            (_, PaymentEvent::Fail { reason }) => Ok(Self::Failed { reason }),
            (
                Self::MethodSelected {
                    provider: PaymentProvider::PayPal,
                },
                PaymentEvent::RedirectToPaypal { reference },
            ) => Ok(Self::PaypalRedirect { reference }),
            (
                Self::MethodSelected {
                    provider: PaymentProvider::Razorpay,
                },
                PaymentEvent::OpenRazorpay { provider_order_id },
            ) => Ok(Self::RazorpayWidgetOpen { provider_order_id }),
            (
                Self::MethodSelected {
                    provider: PaymentProvider::Offline,
                },
                PaymentEvent::SubmitDirect,
            )
            | (
                Self::PaypalRedirect { .. } | Self::RazorpayWidgetOpen { .. },
                PaymentEvent::PaymentVerified,
            ) => Ok(Self::DirectSubmit),
            (Self::DirectSubmit, PaymentEvent::OrderCreated { order_id }) => {
                Ok(Self::OrderPlaced { order_id })
            }
            _ => Err(invalid),
        }
    }
}
