//! Session-related types.
//!
//! The browser never holds backend credentials. Tokens, the cart, the
//! wishlist and the checkout in progress all live in the server-side session.

use serde::{Deserialize, Serialize};

use lustre_core::{UserId, UserRole};

use crate::backend::BackendUser;

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self.role, UserRole::Guest)
    }
}

impl From<&BackendUser> for CurrentUser {
    fn from(user: &BackendUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Backend bearer tokens for the signed-in user.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user ([`super::CurrentUser`]).
    pub const CURRENT_USER: &str = "current_user";

    /// Backend tokens ([`super::SessionTokens`]).
    pub const TOKENS: &str = "tokens";

    /// The shopper's cart.
    pub const CART: &str = "cart";

    /// Wishlisted product IDs.
    pub const WISHLIST: &str = "wishlist";

    /// The checkout in progress.
    pub const CHECKOUT: &str = "checkout";

    /// The "buy now" item that replaces the cart for one checkout.
    pub const DIRECT_ITEM: &str = "direct_item";

    /// Address chosen on the address step, kept between steps.
    pub const SELECTED_SHIPPING_ADDRESS: &str = "selected_shipping_address";

    /// Method chosen on the shipping step, kept between steps.
    pub const SELECTED_SHIPPING_METHOD: &str = "selected_shipping_method";

    /// The order paid for in the open Razorpay widget.
    pub const RAZORPAY_ORDER: &str = "razorpay_order";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = SessionTokens {
            access_token: "eyJhbGciOi".to_string(),
            refresh_token: Some("r-123".to_string()),
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("eyJhbGciOi"));
        assert!(!debug.contains("r-123"));
    }
}
