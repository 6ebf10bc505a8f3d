//! Money: an arbitrary-precision decimal amount tagged with a currency
//!
//! Stayline keeps full `Decimal` precision through all intermediate
//! arithmetic (including USD-pivot conversion hops) and rounds to 2 decimal
//! places only at display or persistence boundaries, via [`Money::rounded`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::CurrencyCode;

/// Decimal places kept at display/persistence boundaries
pub const DISPLAY_SCALE: u32 = 2;

/// Round a bare amount to the display/persistence scale (half away from
/// zero). Intermediate arithmetic must not use this.
pub fn round_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Errors from money arithmetic
#[derive(Debug, Clone, Error)]
pub enum MoneyError {
    /// Arithmetic across two different currencies without conversion
    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },
}

/// A decimal amount in a specific currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency
    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Convenience constructor for USD amounts
    pub fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::usd())
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Add another amount in the same currency
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    /// Subtract another amount in the same currency
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency.clone()))
    }

    /// Round to the display/persistence scale (2 decimal places, half away
    /// from zero). Intermediate arithmetic must not use this.
    pub fn rounded(&self) -> Money {
        Money::new(round_display(self.amount), self.currency.clone())
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                expected: self.currency.to_string(),
                actual: other.currency.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.prec$}",
            self.currency.symbol(),
            self.rounded().amount,
            prec = DISPLAY_SCALE as usize
        )
    }
}
