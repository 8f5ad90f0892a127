//! Shipping addresses, shipping methods, and the location heuristic that
//! decides which methods a shopper may pick.
//!
//! Shipping methods are configured in the back-office with descriptive names
//! ("Surat City Delivery", "Rest of Gujarat", "Rest of India",
//! "International Courier"). The zone a method serves is read from its name;
//! the address decides which zone the shopper is in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AddressId, RecordStatus, ShippingMethodId};

/// A saved delivery address (backend record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
    pub mobile_no: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pancard: Option<String>,
}

impl ShippingAddress {
    /// The backend ID, if this address has been saved and the ID is usable.
    #[must_use]
    pub fn saved_id(&self) -> Option<&AddressId> {
        self.id.as_ref().filter(|id| !id.is_blank())
    }

    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("fullName", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("zipCode", &self.zip_code),
            ("mobileNo", &self.mobile_no),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Pick the address to pre-select on the address step.
///
/// Precedence: the explicitly requested ID (when it is in the list), then the
/// address flagged default, then the first address.
#[must_use]
pub fn preselect_address<'a>(
    addresses: &'a [ShippingAddress],
    explicit: Option<&AddressId>,
) -> Option<&'a ShippingAddress> {
    explicit
        .and_then(|wanted| addresses.iter().find(|a| a.saved_id() == Some(wanted)))
        .or_else(|| addresses.iter().find(|a| a.is_default))
        .or_else(|| addresses.first())
}

/// A delivery option configured in the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    #[serde(rename = "_id")]
    pub id: ShippingMethodId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub description: Option<String>,
}

/// The region a shipping method serves, read from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingZone {
    SuratCity,
    RestOfGujarat,
    RestOfIndia,
    International,
}

const HOME_CITY: &str = "surat";
const HOME_STATE: &str = "gujarat";
const HOME_COUNTRY: &str = "india";

impl ShippingZone {
    /// Zone named by a shipping method, or `None` if the name mentions no
    /// known zone.
    #[must_use]
    pub fn from_method_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name.contains("surat city") {
            Some(Self::SuratCity)
        } else if name.contains("rest of gujarat") {
            Some(Self::RestOfGujarat)
        } else if name.contains("rest of india") {
            Some(Self::RestOfIndia)
        } else if name.contains("international") {
            Some(Self::International)
        } else {
            None
        }
    }

    /// Whether an address falls in this zone.
    #[must_use]
    pub fn covers(self, address: &ShippingAddress) -> bool {
        let city = normalize(&address.city);
        let state = normalize(&address.state);
        let country = normalize(&address.country);

        match self {
            Self::SuratCity => city == HOME_CITY,
            Self::RestOfGujarat => state == HOME_STATE && city != HOME_CITY,
            Self::RestOfIndia => country == HOME_COUNTRY && state != HOME_STATE,
            Self::International => country != HOME_COUNTRY,
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Active shipping methods that serve `address`, cheapest first.
///
/// Methods whose name names no zone are never offered. Ties in price keep the
/// backend's order. The function is pure: the same inputs always produce the
/// same ordered subset.
#[must_use]
pub fn applicable_methods(address: &ShippingAddress, methods: &[ShippingMethod]) -> Vec<ShippingMethod> {
    let mut applicable: Vec<ShippingMethod> = methods
        .iter()
        .filter(|m| m.status.is_active())
        .filter(|m| ShippingZone::from_method_name(&m.name).is_some_and(|zone| zone.covers(address)))
        .cloned()
        .collect();
    applicable.sort_by(|a, b| a.price.cmp(&b.price));
    applicable
}
