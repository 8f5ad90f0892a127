//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Session-stored cart, wishlist and "buy now" item
//! - `checkout` - Step orchestration, order placement and payment hand-offs

pub mod cart;
pub mod checkout;

pub use checkout::{CheckoutService, CheckoutView, PaymentOutcome, PlaceOrderResponse};
