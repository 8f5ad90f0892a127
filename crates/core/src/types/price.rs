//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as JSON numbers in rupees. They are parsed into
//! [`Decimal`] so that totals never accumulate floating point error.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a rupee price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Amount in the smallest currency unit (paise for INR).
    ///
    /// Payment providers expect integer minor units.
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        let scaled = round_money(self.amount) * Decimal::ONE_HUNDRED;
        scaled.trunc().try_into().unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            round_money(self.amount)
        )
    }
}

/// ISO 4217 currency codes the store transacts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// Three letter code as sent to payment providers.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}

/// Round a money amount to two decimal places, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_paise() {
        let price = Price::inr(Decimal::new(1_234_567, 3));
        assert_eq!(price.to_string(), "₹1234.57");
    }

    #[test]
    fn test_minor_units() {
        let price = Price::inr(Decimal::new(49_950, 2));
        assert_eq!(price.minor_units(), 49_950);
    }

    #[test]
    fn test_round_money_midpoint() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
    }
}
