//! Posting conservation check for a single atomic unit.
//!
//! Invariant enforced before every commit:
//! ```text
//! ∀ currency: Σ debits + Σ converted_in == Σ credits + Σ fees + Σ cash_out + Σ converted_out
//! ```
//!
//! Money may only leave the ledger through a declared fee (retained by the
//! service), a declared cash leg (handed over by a courier), or a declared
//! conversion into another currency. Anything else is a bug and the unit
//! is refused.

use std::collections::{BTreeMap, BTreeSet};

use courierpay_types::{CourierpayError, CurrencyCode, Result};
use rust_decimal::Decimal;

/// Per-currency totals for one unit.
#[derive(Debug, Default, Clone)]
pub struct PostingBalance {
    debits: BTreeMap<CurrencyCode, Decimal>,
    credits: BTreeMap<CurrencyCode, Decimal>,
    fees: BTreeMap<CurrencyCode, Decimal>,
    cash_out: BTreeMap<CurrencyCode, Decimal>,
    converted_out: BTreeMap<CurrencyCode, Decimal>,
    converted_in: BTreeMap<CurrencyCode, Decimal>,
}

fn add(
    map: &mut BTreeMap<CurrencyCode, Decimal>,
    currency: &CurrencyCode,
    amount: Decimal,
) -> Result<()> {
    let total = map.entry(currency.clone()).or_insert(Decimal::ZERO);
    *total = total.checked_add(amount).ok_or_else(|| {
        CourierpayError::Internal(format!("posting total in {currency} overflows"))
    })?;
    Ok(())
}

fn get(map: &BTreeMap<CurrencyCode, Decimal>, currency: &CurrencyCode) -> Decimal {
    map.get(currency).copied().unwrap_or(Decimal::ZERO)
}

impl PostingBalance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every `record_*` fails with `Internal` if a running total overflows.

    pub fn record_debit(&mut self, currency: &CurrencyCode, amount: Decimal) -> Result<()> {
        add(&mut self.debits, currency, amount)
    }

    pub fn record_credit(&mut self, currency: &CurrencyCode, amount: Decimal) -> Result<()> {
        add(&mut self.credits, currency, amount)
    }

    /// Fee retained by the service. Credited nowhere.
    pub fn record_fee(&mut self, currency: &CurrencyCode, amount: Decimal) -> Result<()> {
        add(&mut self.fees, currency, amount)
    }

    /// Value leaving the ledger as physical cash.
    pub fn record_cash_out(&mut self, currency: &CurrencyCode, amount: Decimal) -> Result<()> {
        add(&mut self.cash_out, currency, amount)
    }

    /// `amount` of `from` was exchanged into `converted` of `to`.
    pub fn record_conversion(
        &mut self,
        from: &CurrencyCode,
        amount: Decimal,
        to: &CurrencyCode,
        converted: Decimal,
    ) -> Result<()> {
        add(&mut self.converted_out, from, amount)?;
        add(&mut self.converted_in, to, converted)
    }

    /// Every currency touched by this unit.
    #[must_use]
    pub fn currencies(&self) -> BTreeSet<CurrencyCode> {
        self.debits
            .keys()
            .chain(self.credits.keys())
            .chain(self.fees.keys())
            .chain(self.cash_out.keys())
            .chain(self.converted_out.keys())
            .chain(self.converted_in.keys())
            .cloned()
            .collect()
    }

    /// Verify the invariant for every currency.
    ///
    /// # Errors
    /// Returns `Internal` naming the first unbalanced currency.
    pub fn verify(&self) -> Result<()> {
        let sum = |currency: &CurrencyCode, maps: &[&BTreeMap<CurrencyCode, Decimal>]| {
            maps.iter()
                .try_fold(Decimal::ZERO, |acc, map| acc.checked_add(get(map, currency)))
                .ok_or_else(|| {
                    CourierpayError::Internal(format!("posting sum in {currency} overflows"))
                })
        };
        for currency in self.currencies() {
            let inflow = sum(&currency, &[&self.debits, &self.converted_in])?;
            let outflow = sum(
                &currency,
                &[&self.credits, &self.fees, &self.cash_out, &self.converted_out],
            )?;
            if inflow != outflow {
                return Err(CourierpayError::Internal(format!(
                    "posting imbalance in {currency}: debits+converted_in {inflow} != \
                     credits+fees+cash+converted_out {outflow} (debits={}, credits={}, fees={})",
                    get(&self.debits, &currency),
                    get(&self.credits, &currency),
                    get(&self.fees, &currency),
                )));
            }
        }
        Ok(())
    }
}
