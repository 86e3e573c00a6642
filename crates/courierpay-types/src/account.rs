//! Balance-holding payment instruments: cards and wallets.
//!
//! An account's balance is never negative. It is only mutated by the
//! ledger's atomic unit; everything else sees copies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, CurrencyCode, UserId};

/// The instrument behind an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountKind {
    /// A registered payment card. Only the last four digits are kept.
    Card {
        last_four: String,
        cardholder_name: String,
    },
    /// The user's in-app wallet. At most one per user.
    Wallet,
}

impl AccountKind {
    #[must_use]
    pub fn is_wallet(&self) -> bool {
        matches!(self, Self::Wallet)
    }

    #[must_use]
    pub fn is_card(&self) -> bool {
        matches!(self, Self::Card { .. })
    }
}

/// A card or wallet with its balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: UserId,
    pub kind: AccountKind,
    /// Current balance, 2 fractional digits, never negative.
    pub balance: Decimal,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with an initial balance.
    #[must_use]
    pub fn open(owner: UserId, kind: AccountKind, currency: CurrencyCode, balance: Decimal) -> Self {
        Self {
            id: AccountId::new(),
            owner,
            kind,
            balance,
            currency,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    #[must_use]
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> AccountKind {
        AccountKind::Card {
            last_four: "4242".into(),
            cardholder_name: "Test Holder".into(),
        }
    }

    #[test]
    fn open_sets_owner_and_balance() {
        let owner = UserId::new();
        let acct = Account::open(
            owner,
            card(),
            CurrencyCode::parse("AED").unwrap(),
            Decimal::new(10_000, 2),
        );
        assert!(acct.is_owned_by(owner));
        assert!(!acct.is_owned_by(UserId::new()));
        assert!(acct.can_cover(Decimal::new(100, 0)));
        assert!(!acct.can_cover(Decimal::new(10_001, 2)));
    }

    #[test]
    fn kind_tagged_serde() {
        let json = serde_json::to_string(&AccountKind::Wallet).unwrap();
        assert_eq!(json, r#"{"kind":"wallet"}"#);
        let back: AccountKind = serde_json::from_str(
            r#"{"kind":"card","last_four":"1111","cardholder_name":"A"}"#,
        )
        .unwrap();
        assert!(back.is_card());
    }
}
