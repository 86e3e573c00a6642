//! Currency conversion pre-step.
//!
//! Runs before the ledger unit opens, so the oracle round-trip never holds an
//! account lock. The resulting [`Quote`] is fixed for the rest of the
//! transfer.

use courierpay_types::{convert, CourierpayError, CurrencyCode, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::oracle::RateOracle;

/// A priced exchange: `amount` of `from` buys `converted` of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
    pub amount: Decimal,
    /// `round(amount · rate, 2)`, half-up.
    pub converted: Decimal,
}

/// Prices a conversion against a [`RateOracle`].
pub struct ConversionStep<'a> {
    oracle: &'a dyn RateOracle,
}

impl<'a> ConversionStep<'a> {
    #[must_use]
    pub fn new(oracle: &'a dyn RateOracle) -> Self {
        Self { oracle }
    }

    /// Quote `amount` of `from` in `to`.
    ///
    /// # Errors
    /// - `ConversionUnavailable` if the oracle has no rate
    /// - `Validation` if the converted amount rounds to zero or overflows
    pub async fn quote(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> Result<Quote> {
        let Some(rate) = self.oracle.rate(from, to).await else {
            tracing::warn!(%from, %to, oracle = self.oracle.name(), "No exchange rate available");
            return Err(CourierpayError::ConversionUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            });
        };
        let converted = convert(amount, rate)?;
        if converted <= Decimal::ZERO {
            return Err(CourierpayError::validation(format!(
                "{amount} {from} is worth nothing in {to} at rate {rate}"
            )));
        }
        tracing::debug!(%from, %to, %rate, %amount, %converted, "Conversion quoted");
        Ok(Quote {
            from: from.clone(),
            to: to.clone(),
            rate,
            amount,
            converted,
        })
    }
}
