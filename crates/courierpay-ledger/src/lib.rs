//! # courierpay-ledger
//!
//! **Ledger Store**: the transactional state container for accounts,
//! transactions, signatures and users.
//!
//! ## Architecture
//!
//! 1. **LedgerStore**: accounts behind per-account locks, the transaction
//!    log, and signatures
//! 2. **LedgerUnit**: the staging area handed to an atomic unit; sees
//!    pre-mutation balances, collects debits/credits and one transaction
//!    insert, commits all of it or none of it
//! 3. **PostingBalance**: per-currency check that every committed unit's
//!    debits equal its credits plus declared fees, cash legs and
//!    conversions
//! 4. **UserDirectory**: users as supplied by the identity collaborator
//!
//! ## Locking
//!
//! ```text
//! atomically([a, b]) → lock a, b in id order → closure stages postings
//!     → PostingBalance.verify() → write balances + insert transaction → unlock
//! ```
//!
//! Units over disjoint accounts never wait on each other. Units sharing an
//! account serialize on that account's lock, so no update is lost.

pub mod conservation;
pub mod directory;
pub mod store;
pub mod unit;

pub use conservation::PostingBalance;
pub use directory::UserDirectory;
pub use store::LedgerStore;
pub use unit::LedgerUnit;
