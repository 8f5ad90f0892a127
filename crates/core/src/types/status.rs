//! Status enums for various entities.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether a backend record (category, shipping method, payment method) is
/// offered to shoppers.
///
/// The backend is inconsistent about casing (`"active"`, `"Active"`,
/// `"ACTIVE"`), so deserialization is case-insensitive. Anything that is not
/// recognizably active is treated as inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    Active,
    #[default]
    Inactive,
}

impl RecordStatus {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl From<String> for RecordStatus {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.as_str().to_owned()
    }
}

/// Lifecycle of a payment that leaves the site (PayPal redirect).
///
/// Stored as text in the `storefront.pending_payment` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPaymentStatus {
    /// Shopper was redirected to the provider; no order exists yet.
    Pending,
    /// The success callback created the order.
    Completed,
    /// The shopper cancelled at the provider.
    Cancelled,
}

impl PendingPaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PendingPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`PendingPaymentStatus`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown pending payment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PendingPaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Role of a backend user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Admin,
    #[default]
    Customer,
    Guest,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "user",
            Self::Guest => "guest",
        }
    }
}

impl From<String> for UserRole {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "superadmin" | "super_admin" => Self::Admin,
            "guest" => Self::Guest,
            _ => Self::Customer,
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_owned()
    }
}
