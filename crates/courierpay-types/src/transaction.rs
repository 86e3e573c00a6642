//! Money-movement transactions and their delivery lifecycle.
//!
//! ## Delivery State Machine
//!
//! ```text
//!   ┌─────────┐ claim / nearest-agent ┌──────────┐  pick up  ┌────────────┐
//!   │ PENDING ├──────────────────────▶│ ASSIGNED ├──────────▶│ IN_TRANSIT │
//!   └─────────┘                       └────┬─────┘           └─────┬──────┘
//!                                          │ hand over + signature │
//!                                          ▼                       │
//!                                     ┌───────────┐                │
//!                                     │ DELIVERED │◀───────────────┘
//!                                     └───────────┘
//! ```
//!
//! Transitions are **monotonic**: nothing moves backwards and nothing leaves
//! `DELIVERED`. Reaching `DELIVERED` completes the business status in the
//! same update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, AgentRef, Coordinates, CourierpayError, CurrencyCode, Result, TransactionId, UserId,
};

/// Kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Cash collected from the user by a courier.
    Deposit,
    /// Cash handed to the user by a courier.
    Withdrawal,
    /// Pay another user.
    SendMoney,
    /// Pull a payment that another user owes; `recipient` names the sender.
    ReceiveMoney,
    /// Move funds from one of the user's cards into their wallet.
    CardToWallet,
    /// Move funds from the user's wallet onto one of their cards.
    WalletToCard,
}

impl TransactionType {
    /// Types that credit another user's primary account net of the fee.
    #[must_use]
    pub fn is_peer_transfer(self) -> bool {
        matches!(self, Self::SendMoney | Self::ReceiveMoney)
    }

    /// Types that move funds between two of the caller's own instruments.
    #[must_use]
    pub fn is_own_transfer(self) -> bool {
        matches!(self, Self::CardToWallet | Self::WalletToCard)
    }

    /// Own-instrument transfers settle immediately; everything else waits
    /// for the courier.
    #[must_use]
    pub fn settles_immediately(self) -> bool {
        self.is_own_transfer()
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdrawal => write!(f, "withdrawal"),
            Self::SendMoney => write!(f, "send_money"),
            Self::ReceiveMoney => write!(f, "receive_money"),
            Self::CardToWallet => write!(f, "card_to_wallet"),
            Self::WalletToCard => write!(f, "wallet_to_card"),
        }
    }
}

/// Business outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Physical delivery progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
}

impl DeliveryStatus {
    /// Can the delivery move from `self` to `target`?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Assigned)
                | (Self::Assigned, Self::InTransit | Self::Delivered)
                | (Self::InTransit, Self::Delivered)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Delivered
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Assigned => write!(f, "assigned"),
            Self::InTransit => write!(f, "in_transit"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

/// A persisted money movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    /// The sender, or the requester when nobody else sends.
    pub user: UserId,
    /// The debited account.
    pub source_account: AccountId,
    /// The user expected to receive (and sign for) the funds.
    pub recipient: Option<UserId>,
    /// The credited account, if the movement credits one.
    pub credit_account: Option<AccountId>,
    /// Debited amount in `currency_from`.
    pub amount: Decimal,
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    /// `round(amount · rate, 2)` when the conversion pre-step ran.
    pub converted_amount: Option<Decimal>,
    pub rate: Option<Decimal>,
    /// What the credited account actually received.
    pub credited_amount: Option<Decimal>,
    /// Retained by the service, credited nowhere. Denominated in the
    /// credited currency (`currency_to`).
    pub fee: Decimal,
    pub sender_location: Option<Coordinates>,
    pub recipient_location: Option<Coordinates>,
    /// Free-text message or address supplied with the request.
    pub note: Option<String>,
    pub delivery_agent: Option<AgentRef>,
    pub status: TransactionStatus,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Assign a courier. Only valid while the transaction is pending, its
    /// delivery is still `Pending` and nobody holds it.
    ///
    /// # Errors
    /// Returns `Conflict` if the delivery is no longer available.
    pub fn assign_agent(&mut self, agent: AgentRef) -> Result<()> {
        if self.delivery_agent.is_some()
            || self.status != TransactionStatus::Pending
            || !self
                .delivery_status
                .can_transition_to(DeliveryStatus::Assigned)
        {
            return Err(CourierpayError::conflict(format!(
                "transaction {} is unavailable for delivery ({})",
                self.id, self.delivery_status
            )));
        }
        self.delivery_agent = Some(agent);
        self.delivery_status = DeliveryStatus::Assigned;
        Ok(())
    }

    /// Advance the delivery forward. Reaching `Delivered` completes the
    /// transaction.
    ///
    /// # Errors
    /// Returns `Conflict` for any transition the state machine forbids.
    pub fn advance_delivery(&mut self, target: DeliveryStatus) -> Result<()> {
        if target == DeliveryStatus::Assigned || !self.delivery_status.can_transition_to(target) {
            return Err(CourierpayError::conflict(format!(
                "transaction {}: delivery cannot move {} -> {}",
                self.id, self.delivery_status, target
            )));
        }
        if self.status == TransactionStatus::Failed {
            return Err(CourierpayError::conflict(format!(
                "transaction {} has failed",
                self.id
            )));
        }
        self.delivery_status = target;
        if target == DeliveryStatus::Delivered {
            self.status = TransactionStatus::Completed;
        }
        Ok(())
    }

    /// Mark a transaction as failed. Only pending, undelivered work can fail.
    ///
    /// # Errors
    /// Returns `Conflict` if the transaction already completed or failed.
    pub fn mark_failed(&mut self) -> Result<()> {
        if self.status != TransactionStatus::Pending || self.delivery_status.is_terminal() {
            return Err(CourierpayError::conflict(format!(
                "transaction {} is {} and cannot fail",
                self.id, self.status
            )));
        }
        self.status = TransactionStatus::Failed;
        Ok(())
    }

    /// The user whose signature confirms the handover.
    #[must_use]
    pub fn signing_party(&self) -> UserId {
        self.recipient.unwrap_or(self.user)
    }

    /// Whether `user` is a party to this transaction (sender or recipient).
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.user == user || self.recipient == Some(user)
    }

    /// Still waiting for a courier to pick it up.
    #[must_use]
    pub fn awaits_courier(&self) -> bool {
        self.status == TransactionStatus::Pending
            && self.delivery_status == DeliveryStatus::Pending
            && self.delivery_agent.is_none()
    }

    /// A zeroed pending deposit, for tests.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn dummy(user: UserId) -> Self {
        Self {
            id: TransactionId::new(),
            transaction_type: TransactionType::Deposit,
            user,
            source_account: AccountId::new(),
            recipient: Some(user),
            credit_account: None,
            amount: Decimal::new(100, 0),
            currency_from: CurrencyCode::parse("AED").expect("valid code"),
            currency_to: CurrencyCode::parse("AED").expect("valid code"),
            converted_amount: None,
            rate: None,
            credited_amount: None,
            fee: Decimal::ZERO,
            sender_location: None,
            recipient_location: None,
            note: None,
            delivery_agent: None,
            status: TransactionStatus::Pending,
            delivery_status: DeliveryStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
