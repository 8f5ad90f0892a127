//! Order request assembly and totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::types::{
    AddressId, ColorId, OrderStatusId, PaymentMethodId, ProductId, ShippingMethodId, SizeId,
    UserId, round_money,
};

/// Tax rate used when the backend settings do not carry one (jewelry GST).
pub const DEFAULT_TAX_PERCENT: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals for `lines`.
    ///
    /// - `subtotal = Σ price × quantity`
    /// - `discount = Σ max(mrp − price, 0) × quantity` (already reflected in
    ///   the price, reported for display)
    /// - `tax = subtotal × tax_percent / 100`, rounded to paise
    /// - `total = subtotal + shipping + tax`
    #[must_use]
    pub fn compute(lines: &[CartItem], shipping: Decimal, tax_percent: Decimal) -> Self {
        let subtotal: Decimal = lines.iter().map(CartItem::line_total).sum();
        let discount: Decimal = lines.iter().map(CartItem::line_discount).sum();
        let tax = round_money(subtotal * tax_percent / Decimal::ONE_HUNDRED);
        let shipping = round_money(shipping);
        Self {
            subtotal: round_money(subtotal),
            discount: round_money(discount),
            shipping,
            tax,
            total: round_money(subtotal) + shipping + tax,
        }
    }
}

/// One product in an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: ProductId,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeId>,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product: item.id.clone(),
            quantity: item.quantity,
            price: item.price,
            color: item.color_id.clone(),
            size: item.size_id.clone(),
        }
    }
}

/// Body of the backend order-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user: UserId,
    pub shipping_method: Option<ShippingMethodId>,
    pub shipping_cost: Decimal,
    pub shipping_address: AddressId,
    pub products: Vec<OrderLine>,
    pub payment_method: PaymentMethodId,
    pub order_status: OrderStatusId,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub comments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::ring;

    #[test]
    fn test_default_tax_percent_is_three() {
        assert_eq!(DEFAULT_TAX_PERCENT, Decimal::new(3, 0));
    }

    #[test]
    fn test_totals() {
        let lines = vec![ring(2)];
        let totals = OrderTotals::compute(&lines, Decimal::new(50, 0), DEFAULT_TAX_PERCENT);
        assert_eq!(totals.subtotal, Decimal::new(25_000, 0));
        assert_eq!(totals.discount, Decimal::new(3_000, 0));
        assert_eq!(totals.tax, Decimal::new(750, 0));
        assert_eq!(totals.total, Decimal::new(25_800, 0));
    }

    #[test]
    fn test_tax_rounds_to_paise() {
        let mut item = ring(1);
        item.price = Decimal::new(333, 0);
        let totals = OrderTotals::compute(&[item], Decimal::ZERO, DEFAULT_TAX_PERCENT);
        assert_eq!(totals.tax, Decimal::new(999, 2));
        assert_eq!(totals.total, Decimal::new(34_299, 2));
    }

    #[test]
    fn test_order_line_from_cart_item() {
        let line = OrderLine::from(&ring(3));
        assert_eq!(line.quantity, 3);
        assert_eq!(line.size.as_ref().map(SizeId::as_str), Some("12"));
    }
}
