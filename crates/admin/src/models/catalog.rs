//! Back-office form inputs.
//!
//! Each input is checked locally before it is forwarded, so an obviously
//! bad record (blank name, negative price) never reaches the backend. Fields
//! the console does not model are carried through untouched in `extra`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use lustre_core::{CategoryId, OrderStatusId, RecordStatus};

/// A rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Local checks run before a form is forwarded to the backend.
pub trait Validate {
    /// # Errors
    ///
    /// Returns the first field that fails.
    fn validate(&self) -> Result<(), ValidationError>;
}

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    Ok(())
}

// =============================================================================
// Products
// =============================================================================

/// Product create/update form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_min_order_limit")]
    pub min_order_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_order_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_min_order_limit() -> u32 {
    1
}

impl Validate for ProductInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)?;
        require_non_negative("price", self.price)?;
        if let Some(mrp) = self.mrp {
            require_non_negative("mrp", mrp)?;
            if mrp < self.price {
                return Err(ValidationError::new("mrp", "must not be below the price"));
            }
        }
        if self.min_order_limit == 0 {
            return Err(ValidationError::new("minOrderLimit", "must be at least 1"));
        }
        if self
            .max_order_limit
            .is_some_and(|max| max < self.min_order_limit)
        {
            return Err(ValidationError::new(
                "maxOrderLimit",
                "must not be below the minimum order limit",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Categories, payment and shipping methods
// =============================================================================

/// Category create/update form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Validate for CategoryInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)
    }
}

/// Payment method create/update form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodInput {
    pub name: String,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Validate for PaymentMethodInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)
    }
}

/// Shipping method create/update form.
///
/// The name decides where the method applies ("Surat City Delivery",
/// "Rest of Gujarat", "Rest of India", "International ...").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethodInput {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for ShippingMethodInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)?;
        require_non_negative("price", self.price)
    }
}

/// Flip a record between active and inactive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusToggle {
    pub status: RecordStatus,
}

// =============================================================================
// Settings and orders
// =============================================================================

/// Settings update form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Validate for SettingsInput {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.tax_rate {
            Some(rate) if rate.is_sign_negative() && !rate.is_zero() => {
                Err(ValidationError::new("taxRate", "must not be negative"))
            }
            Some(rate) if rate > Decimal::ONE_HUNDRED => {
                Err(ValidationError::new("taxRate", "must be a percentage"))
            }
            _ => Ok(()),
        }
    }
}

/// Move an order to another status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_status: OrderStatusId,
}

impl Validate for OrderStatusUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.order_status.is_blank() {
            return Err(ValidationError::new("orderStatus", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(json: &str) -> ProductInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_product_defaults() {
        let input = product(r#"{"name":"Kundan Choker","price":"18500"}"#);
        assert_eq!(input.min_order_limit, 1);
        assert_eq!(input.status, RecordStatus::Inactive);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let input = product(r#"{"name":"   ","price":"100"}"#);
        assert_eq!(input.validate().unwrap_err().field, "name");
    }

    #[test]
    fn test_negative_price_rejected() {
        let input = product(r#"{"name":"Ring","price":"-1"}"#);
        assert_eq!(input.validate().unwrap_err().field, "price");
    }

    #[test]
    fn test_mrp_below_price_rejected() {
        let input = product(r#"{"name":"Ring","price":"500","mrp":"400"}"#);
        assert_eq!(input.validate().unwrap_err().field, "mrp");
    }

    #[test]
    fn test_order_limits_checked() {
        let input = product(r#"{"name":"Ring","price":"500","minOrderLimit":3,"maxOrderLimit":2}"#);
        assert_eq!(input.validate().unwrap_err().field, "maxOrderLimit");
    }

    #[test]
    fn test_unknown_product_fields_pass_through() {
        let input = product(r#"{"name":"Ring","price":"500","purity":"22K","images":["a.jpg"]}"#);
        let forwarded = serde_json::to_value(&input).unwrap();
        assert_eq!(forwarded["purity"], "22K");
        assert_eq!(forwarded["minOrderLimit"], 1);
    }

    #[test]
    fn test_free_shipping_is_allowed() {
        let input: ShippingMethodInput =
            serde_json::from_str(r#"{"name":"Surat City Delivery","price":"0","status":"Active"}"#)
                .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.status, RecordStatus::Active);
    }

    #[test]
    fn test_tax_rate_bounds() {
        let ok: SettingsInput = serde_json::from_str(r#"{"taxRate":"3"}"#).unwrap();
        assert!(ok.validate().is_ok());

        let too_high: SettingsInput = serde_json::from_str(r#"{"taxRate":"300"}"#).unwrap();
        assert!(too_high.validate().is_err());
    }

    #[test]
    fn test_blank_order_status_rejected() {
        let update: OrderStatusUpdate = serde_json::from_str(r#"{"orderStatus":""}"#).unwrap();
        assert!(update.validate().is_err());
    }
}
