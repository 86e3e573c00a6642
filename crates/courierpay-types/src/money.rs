//! Fixed-point money helpers.
//!
//! Every persisted amount carries exactly [`MONEY_SCALE`] fractional digits.
//! Products (fees, conversions) are rounded half-up at the point of
//! persistence, never truncated.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::MONEY_SCALE;
use crate::{CourierpayError, Result};

/// Round to 2 fractional digits, half-up.
///
/// All amounts in the ledger are positive, so "midpoint away from zero" is
/// the classic half-up rule.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn checked_product(amount: Decimal, factor: Decimal) -> Result<Decimal> {
    amount
        .checked_mul(factor)
        .map(round_money)
        .ok_or_else(|| CourierpayError::validation(format!("{amount} x {factor} overflows")))
}

/// Amount credited to the counterparty after the flat fee:
/// `round(amount · (1 − fee_rate), 2)`.
///
/// # Errors
/// Returns `Validation` if the product does not fit a `Decimal`.
pub fn net_of_fee(amount: Decimal, fee_rate: Decimal) -> Result<Decimal> {
    let keep = Decimal::ONE
        .checked_sub(fee_rate)
        .ok_or_else(|| CourierpayError::validation(format!("fee rate {fee_rate} overflows")))?;
    checked_product(amount, keep)
}

/// Converted amount: `round(amount · rate, 2)`.
///
/// # Errors
/// Returns `Validation` if the product does not fit a `Decimal`.
pub fn convert(amount: Decimal, rate: Decimal) -> Result<Decimal> {
    checked_product(amount, rate)
}

/// An ISO-4217 style currency code: exactly three ASCII upper-case letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and validate a currency code.
    ///
    /// # Errors
    /// Returns `Validation` unless the code is three upper-case ASCII letters.
    pub fn parse(code: &str) -> Result<Self> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(CourierpayError::validation(format!(
                "invalid currency code '{code}'"
            )))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CourierpayError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
