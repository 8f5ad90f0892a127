//! Session-stored admin identity.

use serde::{Deserialize, Serialize};

use lustre_core::UserId;

use crate::backend::LoginUser;

/// The signed-in admin and the backend token their edits are made with.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Sign-in email, when the backend returned it.
    pub email: Option<String>,
    /// Backend bearer token.
    pub access_token: String,
}

impl CurrentAdmin {
    #[must_use]
    pub fn new(user: &LoginUser, access_token: String) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            access_token,
        }
    }
}

impl std::fmt::Debug for CurrentAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentAdmin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
