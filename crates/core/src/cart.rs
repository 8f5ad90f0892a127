//! Shopping cart lines and quantity rules.
//!
//! The cart is owned by the shopper's session. Every mutation validates the
//! requested quantity against the product's order limits and stock first and
//! leaves the cart untouched when validation fails.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ColorId, ProductId, SizeId};

/// Quantity or lookup rule violated by a cart operation.
///
/// The `Display` text is shown to shoppers verbatim as a toast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Minimum order quantity is {min}")]
    BelowMinimum { min: u32 },
    #[error("Maximum order quantity is {max}")]
    AboveMaximum { max: u32 },
    #[error("Only {stock} items available in stock")]
    InsufficientStock { stock: u32 },
    #[error("This item is out of stock")]
    OutOfStock,
    #[error("Item not found in cart")]
    LineNotFound,
}

fn default_min_order_limit() -> u32 {
    1
}

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product ID.
    pub id: ProductId,
    pub name: String,
    /// Unit selling price.
    pub price: Decimal,
    /// Unit list price before discount, when the product shows one.
    #[serde(default)]
    pub mrp: Option<Decimal>,
    pub quantity: u32,
    #[serde(default = "default_min_order_limit")]
    pub min_order_limit: u32,
    #[serde(default)]
    pub max_order_limit: Option<u32>,
    pub stock: u32,
    #[serde(default)]
    pub color_id: Option<ColorId>,
    #[serde(default)]
    pub size_id: Option<SizeId>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartItem {
    /// Identity of this line within a cart.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.id.clone(),
            color_id: self.color_id.clone(),
            size_id: self.size_id.clone(),
        }
    }

    /// Check `quantity` against this item's limits and stock.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, checked in the order minimum,
    /// maximum, stock.
    pub fn validate_quantity(&self, quantity: u32) -> Result<(), CartError> {
        let min = self.min_order_limit.max(1);
        if quantity < min {
            return Err(CartError::BelowMinimum { min });
        }
        if let Some(max) = self.max_order_limit
            && max > 0
            && quantity > max
        {
            return Err(CartError::AboveMaximum { max });
        }
        if self.stock == 0 {
            return Err(CartError::OutOfStock);
        }
        if quantity > self.stock {
            return Err(CartError::InsufficientStock { stock: self.stock });
        }
        Ok(())
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Savings against the list price for the whole line, never negative.
    #[must_use]
    pub fn line_discount(&self) -> Decimal {
        self.mrp
            .map(|mrp| (mrp - self.price).max(Decimal::ZERO) * Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Identity of a cart line: the same product in another color or size is a
/// separate line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: ProductId,
    #[serde(default)]
    pub color_id: Option<ColorId>,
    #[serde(default)]
    pub size_id: Option<SizeId>,
}

/// The shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.key() == key)
    }

    /// Add an item, merging with an existing line for the same product,
    /// color and size.
    ///
    /// A new line below its minimum order quantity is raised to the minimum.
    /// A merged line takes the incoming item's price, limits and stock.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the resulting quantity is not allowed; the
    /// cart is unchanged in that case.
    pub fn add(&mut self, mut item: CartItem) -> Result<&CartItem, CartError> {
        let key = item.key();
        if let Some(index) = self.items.iter().position(|i| i.key() == key) {
            let merged = self
                .items
                .get(index)
                .map_or(item.quantity, |existing| {
                    existing.quantity.saturating_add(item.quantity)
                });
            item.validate_quantity(merged)?;
            item.quantity = merged;
            let slot = self.items.get_mut(index).ok_or(CartError::LineNotFound)?;
            *slot = item;
            return self.items.get(index).ok_or(CartError::LineNotFound);
        }

        item.quantity = item.quantity.max(item.min_order_limit.max(1));
        item.validate_quantity(item.quantity)?;
        self.items.push(item);
        self.items.last().ok_or(CartError::LineNotFound)
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] for an unknown line, or the
    /// violated quantity rule. The cart is unchanged on error.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<&CartItem, CartError> {
        let line = self
            .items
            .iter_mut()
            .find(|i| &i.key() == key)
            .ok_or(CartError::LineNotFound)?;
        line.validate_quantity(quantity)?;
        line.quantity = quantity;
        Ok(line)
    }

    /// Remove a line, returning it if present.
    pub fn remove(&mut self, key: &LineKey) -> Option<CartItem> {
        let index = self.items.iter().position(|i| &i.key() == key)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ring(quantity: u32) -> CartItem {
        CartItem {
            id: ProductId::new("ring-1"),
            name: "Solitaire Ring".to_string(),
            price: Decimal::new(12_500, 0),
            mrp: Some(Decimal::new(14_000, 0)),
            quantity,
            min_order_limit: 1,
            max_order_limit: Some(5),
            stock: 10,
            color_id: Some(ColorId::new("gold")),
            size_id: Some(SizeId::new("12")),
            image: None,
        }
    }

    #[test]
    fn test_update_below_minimum_is_rejected_and_cart_unchanged() {
        let mut item = ring(2);
        item.min_order_limit = 2;
        let key = item.key();
        let mut cart = Cart::new();
        cart.add(item).unwrap();
        let before = cart.clone();

        let err = cart.update_quantity(&key, 1).unwrap_err();

        assert_eq!(err.to_string(), "Minimum order quantity is 2");
        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_above_maximum() {
        let mut cart = Cart::new();
        let key = cart.add(ring(1)).unwrap().key();
        let err = cart.update_quantity(&key, 6).unwrap_err();
        assert_eq!(err, CartError::AboveMaximum { max: 5 });
    }

    #[test]
    fn test_update_above_stock() {
        let mut item = ring(1);
        item.max_order_limit = None;
        item.stock = 3;
        let mut cart = Cart::new();
        let key = cart.add(item).unwrap().key();
        let err = cart.update_quantity(&key, 4).unwrap_err();
        assert_eq!(err.to_string(), "Only 3 items available in stock");
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_add_merges_same_variant() {
        let mut cart = Cart::new();
        cart.add(ring(1)).unwrap();
        cart.add(ring(2)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_other_size_is_separate_line() {
        let mut cart = Cart::new();
        cart.add(ring(1)).unwrap();
        let mut other = ring(1);
        other.size_id = Some(SizeId::new("14"));
        cart.add(other).unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_raises_new_line_to_minimum() {
        let mut item = ring(1);
        item.min_order_limit = 2;
        let mut cart = Cart::new();
        assert_eq!(cart.add(item).unwrap().quantity, 2);
    }

    #[test]
    fn test_add_merge_over_maximum_keeps_cart() {
        let mut cart = Cart::new();
        cart.add(ring(4)).unwrap();
        let err = cart.add(ring(2)).unwrap_err();
        assert_eq!(err, CartError::AboveMaximum { max: 5 });
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut item = ring(1);
        item.stock = 0;
        assert_eq!(Cart::new().add(item).unwrap_err(), CartError::OutOfStock);
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        let line = cart.add(ring(2)).unwrap().clone();
        assert_eq!(cart.subtotal(), Decimal::new(25_000, 0));
        assert_eq!(line.line_discount(), Decimal::new(3_000, 0));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        let key = cart.add(ring(1)).unwrap().key();
        assert!(cart.remove(&key).is_some());
        assert!(cart.remove(&key).is_none());
        cart.add(ring(1)).unwrap();
        cart.clear();
        assert!(cart.is_empty());
    }
}
