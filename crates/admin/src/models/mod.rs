//! Back-office data models.

pub mod catalog;
pub mod session;

pub use catalog::{
    CategoryInput, OrderStatusUpdate, PaymentMethodInput, ProductInput, SettingsInput,
    ShippingMethodInput, StatusToggle, Validate, ValidationError,
};
pub use session::{CurrentAdmin, keys as session_keys};
