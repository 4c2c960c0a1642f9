//! Type-safe money representation using decimal arithmetic.
//!
//! Premiums are computed and stored with [`rust_decimal`] so repeated
//! multiplication never drifts the way binary floats do. Amounts are kept
//! in the currency's standard unit (dollars, not cents); the payment
//! processor is the only consumer that wants minor units.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD amount. Premiums are quoted in USD.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Amount in minor units (cents for USD), as the payment processor
    /// expects. Rounds half-up at the cent boundary.
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        let cents = (self.amount * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents.try_into().unwrap_or(0)
    }

    /// Format for display (e.g., `$416.67`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Currency symbol used for display.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_cents() {
        let monthly = Money::usd(Decimal::new(41667, 2));
        assert_eq!(monthly.display(), "$416.67");
        assert_eq!(monthly.to_string(), "$416.67");
    }

    #[test]
    fn test_minor_units_for_processor() {
        assert_eq!(Money::usd(Decimal::new(41667, 2)).minor_units(), 41_667);
        assert_eq!(Money::usd(Decimal::from(5000)).minor_units(), 500_000);
    }

    #[test]
    fn test_minor_units_rounds_sub_cent_amounts() {
        // 12.345 -> 1234.5 cents -> rounds to 1235 (half-up at the midpoint)
        assert_eq!(Money::usd(Decimal::new(12_345, 3)).minor_units(), 1235);
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(CurrencyCode::USD.code(), "USD");
        assert_eq!(CurrencyCode::USD.symbol(), "$");
        assert_eq!(CurrencyCode::default(), CurrencyCode::USD);
    }
}
