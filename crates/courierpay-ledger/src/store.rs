//! In-memory ledger store with per-account locking.
//!
//! Each account lives behind its own `Mutex`; the maps holding them are only
//! locked long enough to clone an `Arc`. An atomic unit locks its accounts
//! in ascending id order, so two units can never wait on each other in a
//! cycle.
//!
//! Lock order, where more than one is held: account locks → transaction
//! map; transaction record → signature map.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use courierpay_types::{
    Account, AccountId, AccountKind, CourierpayError, CurrencyCode, DigitalSignature, Result,
    Transaction, TransactionId, UserId,
};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rust_decimal::Decimal;

use crate::unit::LedgerUnit;

type Shared<T> = Arc<Mutex<T>>;

/// The transactional store behind the transfer engine.
#[derive(Debug, Default)]
pub struct LedgerStore {
    accounts: RwLock<BTreeMap<AccountId, Shared<Account>>>,
    /// Account ids per owner, in opening order.
    owners: RwLock<HashMap<UserId, Vec<AccountId>>>,
    transactions: RwLock<BTreeMap<TransactionId, Shared<Transaction>>>,
    signatures: Mutex<HashMap<TransactionId, DigitalSignature>>,
}

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Accounts
    // =================================================================

    /// Register a payment card with an opening balance.
    ///
    /// # Errors
    /// Returns `Validation` for a malformed card number suffix or a negative
    /// or over-precise opening balance.
    pub fn open_card(
        &self,
        owner: UserId,
        last_four: &str,
        cardholder_name: &str,
        currency: CurrencyCode,
        opening_balance: Decimal,
    ) -> Result<Account> {
        if last_four.len() != 4 || !last_four.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CourierpayError::validation(
                "last_four must be exactly four digits",
            ));
        }
        let kind = AccountKind::Card {
            last_four: last_four.to_string(),
            cardholder_name: cardholder_name.to_string(),
        };
        self.open(Account::open(owner, kind, currency, opening_balance))
    }

    /// Open the user's wallet.
    ///
    /// # Errors
    /// Returns `Conflict` if the user already holds a wallet, `Validation`
    /// for a bad opening balance.
    pub fn open_wallet(
        &self,
        owner: UserId,
        currency: CurrencyCode,
        opening_balance: Decimal,
    ) -> Result<Account> {
        self.open(Account::open(owner, AccountKind::Wallet, currency, opening_balance))
    }

    fn open(&self, account: Account) -> Result<Account> {
        if account.balance < Decimal::ZERO || account.balance.normalize().scale() > 2 {
            return Err(CourierpayError::validation(format!(
                "opening balance {} must be non-negative with at most 2 decimals",
                account.balance
            )));
        }
        let mut owners = self.owners.write();
        if account.kind.is_wallet() {
            let accounts = self.accounts.read();
            let has_wallet = owners
                .get(&account.owner)
                .into_iter()
                .flatten()
                .filter_map(|id| accounts.get(id))
                .any(|cell| cell.lock().kind.is_wallet());
            if has_wallet {
                return Err(CourierpayError::conflict(format!(
                    "user {} already holds a wallet",
                    account.owner
                )));
            }
        }
        self.accounts
            .write()
            .insert(account.id, Arc::new(Mutex::new(account.clone())));
        owners.entry(account.owner).or_default().push(account.id);

        tracing::info!(
            account = %account.id,
            owner = %account.owner,
            currency = %account.currency,
            balance = %account.balance,
            wallet = account.kind.is_wallet(),
            "Account opened"
        );
        Ok(account)
    }

    fn cell(&self, id: AccountId) -> Result<Shared<Account>> {
        self.accounts
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CourierpayError::not_found(format!("account {id}")))
    }

    /// Snapshot of one account.
    ///
    /// # Errors
    /// Returns `NotFound` if the account does not exist.
    pub fn account(&self, id: AccountId) -> Result<Account> {
        let cell = self.cell(id)?;
        let account = cell.lock().clone();
        Ok(account)
    }

    /// Snapshots of every account a user holds, in opening order.
    #[must_use]
    pub fn accounts_of(&self, owner: UserId) -> Vec<Account> {
        let ids = self.owners.read().get(&owner).cloned().unwrap_or_default();
        ids.into_iter().filter_map(|id| self.account(id).ok()).collect()
    }

    /// The account credited when money is sent to `owner`: their wallet if
    /// they hold one, otherwise their earliest card.
    #[must_use]
    pub fn primary_account_of(&self, owner: UserId) -> Option<Account> {
        let accounts = self.accounts_of(owner);
        accounts
            .iter()
            .find(|a| a.kind.is_wallet())
            .or_else(|| accounts.first())
            .cloned()
    }

    // =================================================================
    // Atomic units
    // =================================================================

    /// Run `f` with exclusive access to `accounts` and commit what it stages.
    ///
    /// `f` observes pre-mutation balances. If `f` or the posting check fails,
    /// no balance changes and no transaction is inserted.
    ///
    /// # Errors
    /// - `NotFound` if any account does not exist
    /// - whatever `f` returns
    /// - `Internal` if the staged postings do not balance
    pub fn atomically<T, F>(&self, accounts: &[AccountId], f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerUnit) -> Result<T>,
    {
        let mut ids = accounts.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let cells = ids
            .iter()
            .map(|id| self.cell(*id))
            .collect::<Result<Vec<_>>>()?;
        let mut guards: Vec<MutexGuard<'_, Account>> = cells.iter().map(|cell| cell.lock()).collect();

        let mut unit = LedgerUnit::new(guards.iter().map(|g| (**g).clone()).collect());
        let value = f(&mut unit)?;
        let (staged, transaction) = unit.finish()?;

        if let Some(tx) = transaction {
            self.transactions
                .write()
                .insert(tx.id, Arc::new(Mutex::new(tx)));
        }
        for guard in &mut guards {
            if let Some(updated) = staged.get(&guard.id) {
                guard.balance = updated.balance;
            }
        }
        Ok(value)
    }

    /// Single-account read-modify-write: `f` sees the current account and
    /// returns the new balance.
    ///
    /// # Errors
    /// - `NotFound` if the account does not exist
    /// - `InsufficientFunds` if the new balance is negative
    /// - `Validation` if the new balance has more than 2 decimals
    /// - whatever `f` returns (balance unchanged)
    pub fn with_account_lock<F>(&self, id: AccountId, f: F) -> Result<Account>
    where
        F: FnOnce(&Account) -> Result<Decimal>,
    {
        let cell = self.cell(id)?;
        let mut guard = cell.lock();
        let next = f(&guard)?;
        if next < Decimal::ZERO {
            return Err(CourierpayError::InsufficientFunds {
                needed: guard.balance.checked_sub(next).unwrap_or(Decimal::MAX),
                available: guard.balance,
            });
        }
        if next.normalize().scale() > 2 {
            return Err(CourierpayError::validation(format!(
                "balance {next} has more than 2 decimals"
            )));
        }
        guard.balance = next;
        Ok(guard.clone())
    }

    // =================================================================
    // Transactions
    // =================================================================

    fn record(&self, id: TransactionId) -> Result<Shared<Transaction>> {
        self.transactions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CourierpayError::not_found(format!("transaction {id}")))
    }

    /// Snapshot of one transaction.
    ///
    /// # Errors
    /// Returns `NotFound` if the transaction does not exist.
    pub fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        let record = self.record(id)?;
        let tx = record.lock().clone();
        Ok(tx)
    }

    /// Conditional update: `f` runs under the record's lock against a working
    /// copy of the transaction and of its signature slot. On `Ok` both are
    /// written back; on `Err` nothing changes.
    ///
    /// A signature, once present, cannot be replaced or removed.
    ///
    /// # Errors
    /// - `NotFound` if the transaction does not exist
    /// - whatever `f` returns
    /// - `Internal` if `f` tried to alter an existing signature
    pub fn update_transaction<T, F>(&self, id: TransactionId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction, &mut Option<DigitalSignature>) -> Result<T>,
    {
        let record = self.record(id)?;
        let mut guard = record.lock();
        let mut signatures = self.signatures.lock();

        let mut working = guard.clone();
        let existing = signatures.get(&id).cloned();
        let mut slot = existing.clone();
        let value = f(&mut working, &mut slot)?;

        if working.id != guard.id || working.created_at != guard.created_at {
            return Err(CourierpayError::Internal(format!(
                "transaction {id}: identity and creation time are immutable"
            )));
        }
        match (existing, slot) {
            (None, Some(new_sig)) => {
                signatures.insert(id, new_sig);
            }
            (existing, slot) if existing == slot => {}
            _ => {
                return Err(CourierpayError::Internal(format!(
                    "transaction {id}: signature is immutable once recorded"
                )));
            }
        }
        *guard = working;
        Ok(value)
    }

    /// The signature recorded for a transaction, if any.
    #[must_use]
    pub fn signature_of(&self, id: TransactionId) -> Option<DigitalSignature> {
        self.signatures.lock().get(&id).cloned()
    }

    /// Snapshots of all transactions matching `pred`, in creation order.
    #[must_use]
    pub fn transactions_where<P>(&self, mut pred: P) -> Vec<Transaction>
    where
        P: FnMut(&Transaction) -> bool,
    {
        self.transactions
            .read()
            .values()
            .map(|record| record.lock().clone())
            .filter(|tx| pred(tx))
            .collect()
    }

    /// Transactions the user is a party to (sender or recipient).
    #[must_use]
    pub fn transactions_of(&self, user: UserId) -> Vec<Transaction> {
        self.transactions_where(|tx| tx.involves(user))
    }

    /// Sum of all balances in one currency. `None` if the sum does not fit.
    #[must_use]
    pub fn total_balance(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.accounts
            .read()
            .values()
            .map(|cell| {
                let account = cell.lock();
                (account.currency == *currency).then_some(account.balance)
            })
            .try_fold(Decimal::ZERO, |total, balance| match balance {
                Some(b) => total.checked_add(b),
                None => Some(total),
            })
    }
}
