//! The staging area of one atomic ledger unit.
//!
//! A [`LedgerUnit`] is only ever handed out by
//! [`LedgerStore::atomically`](crate::LedgerStore::atomically) while the
//! store holds the locks of every account it contains. Nothing written here
//! is visible to anyone until the closure returns `Ok` and the posting
//! check passes.

use std::collections::BTreeMap;

use courierpay_types::{
    Account, AccountId, CourierpayError, CurrencyCode, Result, Transaction,
};
use rust_decimal::Decimal;

use crate::conservation::PostingBalance;

/// Working copies of the locked accounts plus everything staged so far.
#[derive(Debug)]
pub struct LedgerUnit {
    opening: BTreeMap<AccountId, Decimal>,
    working: BTreeMap<AccountId, Account>,
    postings: PostingBalance,
    transaction: Option<Transaction>,
}

impl LedgerUnit {
    pub(crate) fn new(accounts: Vec<Account>) -> Self {
        let opening = accounts.iter().map(|a| (a.id, a.balance)).collect();
        let working = accounts.into_iter().map(|a| (a.id, a)).collect();
        Self {
            opening,
            working,
            postings: PostingBalance::new(),
            transaction: None,
        }
    }

    /// Current (staged) view of a locked account.
    ///
    /// # Errors
    /// Returns `Internal` if the account was not locked for this unit.
    pub fn account(&self, id: AccountId) -> Result<&Account> {
        self.working
            .get(&id)
            .ok_or_else(|| CourierpayError::Internal(format!("{id} is not locked by this unit")))
    }

    /// Balance as it was when the unit acquired its locks.
    ///
    /// # Errors
    /// Returns `Internal` if the account was not locked for this unit.
    pub fn opening_balance(&self, id: AccountId) -> Result<Decimal> {
        self.opening
            .get(&id)
            .copied()
            .ok_or_else(|| CourierpayError::Internal(format!("{id} is not locked by this unit")))
    }

    fn working_mut(&mut self, id: AccountId) -> Result<&mut Account> {
        self.working
            .get_mut(&id)
            .ok_or_else(|| CourierpayError::Internal(format!("{id} is not locked by this unit")))
    }

    /// Take `amount` from an account.
    ///
    /// # Errors
    /// - `Validation` if amount is not positive
    /// - `InsufficientFunds` if the staged balance would go negative
    pub fn debit(&mut self, id: AccountId, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(CourierpayError::validation("debit amount must be positive"));
        }
        let account = self.working_mut(id)?;
        if account.balance < amount {
            return Err(CourierpayError::InsufficientFunds {
                needed: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        let currency = account.currency.clone();
        self.postings.record_debit(&currency, amount)
    }

    /// Add `amount` to an account.
    ///
    /// # Errors
    /// - `Validation` if amount is not positive
    /// - `Validation` if the new balance would not fit a `Decimal`
    pub fn credit(&mut self, id: AccountId, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(CourierpayError::validation("credit amount must be positive"));
        }
        let account = self.working_mut(id)?;
        account.balance = account.balance.checked_add(amount).ok_or_else(|| {
            CourierpayError::validation(format!("crediting {amount} overflows {id}"))
        })?;
        let currency = account.currency.clone();
        self.postings.record_credit(&currency, amount)
    }

    // The `declare_*` legs fail with `Internal` only if a posting total
    // overflows.

    /// Declare a fee retained by the service.
    pub fn declare_fee(&mut self, currency: &CurrencyCode, amount: Decimal) -> Result<()> {
        if amount > Decimal::ZERO {
            self.postings.record_fee(currency, amount)?;
        }
        Ok(())
    }

    /// Declare value leaving the ledger as physical cash.
    pub fn declare_cash_out(&mut self, currency: &CurrencyCode, amount: Decimal) -> Result<()> {
        self.postings.record_cash_out(currency, amount)
    }

    /// Declare a currency exchange performed by this unit.
    pub fn declare_conversion(
        &mut self,
        from: &CurrencyCode,
        amount: Decimal,
        to: &CurrencyCode,
        converted: Decimal,
    ) -> Result<()> {
        self.postings.record_conversion(from, amount, to, converted)
    }

    /// Stage the transaction record committed with these postings.
    ///
    /// # Errors
    /// Returns `Internal` if a record was already staged.
    pub fn insert_transaction(&mut self, transaction: Transaction) -> Result<()> {
        if self.transaction.is_some() {
            return Err(CourierpayError::Internal(
                "a ledger unit inserts at most one transaction".into(),
            ));
        }
        self.transaction = Some(transaction);
        Ok(())
    }

    /// Verify postings and hand back what must be committed.
    pub(crate) fn finish(self) -> Result<(BTreeMap<AccountId, Account>, Option<Transaction>)> {
        self.postings.verify()?;
        Ok((self.working, self.transaction))
    }
}
