//! Inbound transfer requests.

use courierpay_types::{AccountId, Coordinates, TransactionType, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A money movement as submitted by a caller. Nothing here is trusted until
/// the engine has validated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub transaction_type: TransactionType,
    /// Account to debit; must belong to the caller.
    pub source_account: AccountId,
    pub amount: Decimal,
    pub currency_from: String,
    pub currency_to: String,
    /// Ask for a currency exchange when `currency_from != currency_to`.
    #[serde(default)]
    pub convert: bool,
    /// Counterparty: the payee for `send_money`, the payer for
    /// `receive_money`.
    #[serde(default)]
    pub recipient: Option<UserId>,
    /// Destination instrument for `card_to_wallet` / `wallet_to_card`.
    #[serde(default)]
    pub target_account: Option<AccountId>,
    #[serde(default)]
    pub sender_location: Option<Coordinates>,
    #[serde(default)]
    pub recipient_location: Option<Coordinates>,
    /// Free-text message or delivery address.
    #[serde(default)]
    pub note: Option<String>,
}

impl TransferRequest {
    /// A single-currency request with no counterparty yet.
    #[must_use]
    pub fn new(
        transaction_type: TransactionType,
        source_account: AccountId,
        amount: Decimal,
        currency: &str,
    ) -> Self {
        Self {
            transaction_type,
            source_account,
            amount,
            currency_from: currency.to_string(),
            currency_to: currency.to_string(),
            convert: false,
            recipient: None,
            target_account: None,
            sender_location: None,
            recipient_location: None,
            note: None,
        }
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: UserId) -> Self {
        self.recipient = Some(recipient);
        self
    }

    #[must_use]
    pub fn with_target_account(mut self, target: AccountId) -> Self {
        self.target_account = Some(target);
        self
    }

    #[must_use]
    pub fn with_sender_location(mut self, at: Coordinates) -> Self {
        self.sender_location = Some(at);
        self
    }

    #[must_use]
    pub fn with_recipient_location(mut self, at: Coordinates) -> Self {
        self.recipient_location = Some(at);
        self
    }

    /// Credit in `currency` at the oracle's rate.
    #[must_use]
    pub fn converting_to(mut self, currency: &str) -> Self {
        self.currency_to = currency.to_string();
        self.convert = true;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_payload() {
        let source = AccountId::new();
        let json = format!(
            r#"{{"transaction_type":"withdrawal","source_account":"{}","amount":"250.00",
                "currency_from":"AED","currency_to":"AED",
                "recipient_location":{{"latitude":25.2,"longitude":55.27}}}}"#,
            source.0
        );
        let req: TransferRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.transaction_type, TransactionType::Withdrawal);
        assert_eq!(req.source_account, source);
        assert_eq!(req.amount, Decimal::new(25000, 2));
        assert!(!req.convert);
        assert!(req.recipient.is_none());
        assert!(req.recipient_location.is_some());
    }

    #[test]
    fn builder_sets_conversion() {
        let req = TransferRequest::new(
            TransactionType::SendMoney,
            AccountId::new(),
            Decimal::ONE_HUNDRED,
            "AED",
        )
        .converting_to("USD");
        assert!(req.convert);
        assert_eq!(req.currency_from, "AED");
        assert_eq!(req.currency_to, "USD");
    }
}
