//! Transfer engine.
//!
//! ```text
//! execute(request, actor)
//!   ├─ guard: approved User/Admin
//!   ├─ validate (ordered, fail-fast, read-only)      → TransferPlan
//!   ├─ conversion pre-step (oracle, no locks held)   → Option<Quote>
//!   ├─ nearest eligible courier (best effort)        → Option<AgentRef>
//!   └─ one ledger unit: debit, credit, declare fee/cash/conversion,
//!                       insert transaction          → Transaction
//! ```
//!
//! Every rejection happens before the ledger unit opens. Inside the unit the
//! debit is checked again against the locked balance, so a balance that
//! shrank after validation still yields `InsufficientFunds` and no change.

use std::sync::Arc;

use chrono::Utc;
use courierpay_geo::{AgentRegistry, Candidate, NearestAgent, nearest_eligible_agent};
use courierpay_ledger::{LedgerStore, UserDirectory};
use courierpay_types::{
    Account, AccountId, Actor, AgentRef, Coordinates, CourierpayError, CurrencyCode,
    DeliveryStatus, Result, Transaction, TransactionId, TransactionStatus, TransactionType,
    UserId, net_of_fee,
};
use rust_decimal::Decimal;

use crate::conversion::{ConversionStep, Quote};
use crate::oracle::RateOracle;
use crate::request::TransferRequest;

/// Everything validation established about a request.
#[derive(Debug, Clone)]
struct TransferPlan {
    kind: TransactionType,
    source: Account,
    amount: Decimal,
    currency_from: CurrencyCode,
    currency_to: CurrencyCode,
    /// Owner of the transaction record.
    user: UserId,
    recipient: Option<UserId>,
    credit_account: Option<AccountId>,
    sender_location: Option<Coordinates>,
    recipient_location: Option<Coordinates>,
    note: Option<String>,
    needs_quote: bool,
}

impl TransferPlan {
    /// Where the courier has to go: the recipient side, or the sender side
    /// when only that is known (deposits).
    fn dispatch_point(&self) -> Option<Coordinates> {
        if self.kind.settles_immediately() {
            return None;
        }
        self.recipient_location.or(self.sender_location)
    }
}

/// Validates and executes money movements against the ledger.
pub struct TransferEngine {
    ledger: Arc<LedgerStore>,
    directory: Arc<UserDirectory>,
    agents: Arc<AgentRegistry>,
    oracle: Arc<dyn RateOracle>,
    fee_rate: Decimal,
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("oracle", &self.oracle.name())
            .field("fee_rate", &self.fee_rate)
            .finish_non_exhaustive()
    }
}

fn require_location(at: Option<Coordinates>, what: &str) -> Result<Coordinates> {
    at.ok_or_else(|| CourierpayError::validation(format!("{what} coordinates are required")))
}

impl TransferEngine {
    #[must_use]
    pub fn new(
        ledger: Arc<LedgerStore>,
        directory: Arc<UserDirectory>,
        agents: Arc<AgentRegistry>,
        oracle: Arc<dyn RateOracle>,
        fee_rate: Decimal,
    ) -> Self {
        Self {
            ledger,
            directory,
            agents,
            oracle,
            fee_rate,
        }
    }

    #[must_use]
    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    /// Validate and execute one transfer.
    ///
    /// # Errors
    /// `Authorization`, `Validation`, `NotFound`, `InsufficientFunds` or
    /// `ConversionUnavailable`, all raised before any balance changes.
    pub async fn execute(&self, request: &TransferRequest, actor: &Actor) -> Result<Transaction> {
        actor.ensure_can_transfer()?;
        let plan = self.validate(request, actor)?;

        let quote = if plan.needs_quote {
            let step = ConversionStep::new(self.oracle.as_ref());
            Some(
                step.quote(&plan.currency_from, &plan.currency_to, plan.amount)
                    .await?,
            )
        } else {
            None
        };

        let agent = self
            .nearest_courier(plan.dispatch_point())
            .map(|found| found.agent);
        self.commit(&plan, quote.as_ref(), agent)
    }

    // =================================================================
    // Validation
    // =================================================================

    fn validate(&self, request: &TransferRequest, actor: &Actor) -> Result<TransferPlan> {
        // 1. Amount and currencies
        if request.amount <= Decimal::ZERO {
            return Err(CourierpayError::validation("amount must be positive"));
        }
        if request.amount.normalize().scale() > 2 {
            return Err(CourierpayError::validation(format!(
                "amount {} has more than 2 decimals",
                request.amount
            )));
        }
        let currency_from = CurrencyCode::parse(&request.currency_from)?;
        let currency_to = CurrencyCode::parse(&request.currency_to)?;
        for at in [request.sender_location, request.recipient_location]
            .into_iter()
            .flatten()
        {
            if !at.is_valid() {
                return Err(CourierpayError::validation(format!(
                    "coordinates out of range: {at}"
                )));
            }
        }

        // 2. Source account
        let source = self.ledger.account(request.source_account)?;
        if !source.is_owned_by(actor.user_id) {
            return Err(CourierpayError::unauthorized(format!(
                "{} does not belong to {}",
                source.id, actor.user_id
            )));
        }
        if source.currency != currency_from {
            return Err(CourierpayError::validation(format!(
                "{} holds {}, not {currency_from}",
                source.id, source.currency
            )));
        }

        // 3. Funds
        if !source.can_cover(request.amount) {
            return Err(CourierpayError::InsufficientFunds {
                needed: request.amount,
                available: source.balance,
            });
        }

        let mut plan = TransferPlan {
            kind: request.transaction_type,
            source,
            amount: request.amount.round_dp(2),
            currency_from,
            currency_to,
            user: actor.user_id,
            recipient: None,
            credit_account: None,
            sender_location: request.sender_location,
            recipient_location: request.recipient_location,
            note: request.note.clone(),
            needs_quote: false,
        };

        // 4. Type-specific
        match request.transaction_type {
            TransactionType::SendMoney => self.plan_send(&mut plan, request, actor)?,
            TransactionType::ReceiveMoney => self.plan_receive(&mut plan, request, actor)?,
            TransactionType::Withdrawal => {
                require_location(request.recipient_location, "pickup (recipient)")?;
                plan.recipient = Some(actor.user_id);
            }
            TransactionType::Deposit => {
                require_location(request.sender_location, "deposit (sender)")?;
                plan.recipient = Some(actor.user_id);
            }
            TransactionType::CardToWallet | TransactionType::WalletToCard => {
                self.plan_own(&mut plan, request, actor)?;
            }
        }

        // 5. Currency of the credited leg
        if let Some(target) = plan.credit_account {
            self.plan_currency(&mut plan, target, request.convert)?;
        }
        Ok(plan)
    }

    fn plan_send(&self, plan: &mut TransferPlan, req: &TransferRequest, actor: &Actor) -> Result<()> {
        let recipient_id = req
            .recipient
            .ok_or_else(|| CourierpayError::validation("send_money requires a recipient"))?;
        let recipient = self.directory.get(recipient_id)?;
        if recipient.id == actor.user_id {
            return Err(CourierpayError::validation("cannot send money to yourself"));
        }
        let credit = self.ledger.primary_account_of(recipient.id).ok_or_else(|| {
            CourierpayError::validation(format!("recipient {} holds no account", recipient.id))
        })?;
        require_location(req.sender_location, "sender")?;
        require_location(req.recipient_location, "recipient")?;

        plan.recipient = Some(recipient.id);
        plan.credit_account = Some(credit.id);
        Ok(())
    }

    /// `req.recipient` names the payer here. The payer must be able to cover
    /// the amount; the requester's own source account is what gets debited
    /// and the requester's primary account is credited net of the fee.
    fn plan_receive(
        &self,
        plan: &mut TransferPlan,
        req: &TransferRequest,
        actor: &Actor,
    ) -> Result<()> {
        let payer_id = req.recipient.ok_or_else(|| {
            CourierpayError::validation("receive_money requires the paying user in `recipient`")
        })?;
        let payer = self.directory.get(payer_id)?;
        if payer.id == actor.user_id {
            return Err(CourierpayError::validation("cannot receive money from yourself"));
        }
        let payer_account = self.ledger.primary_account_of(payer.id).ok_or_else(|| {
            CourierpayError::validation(format!("payer {} holds no account", payer.id))
        })?;
        if !payer_account.can_cover(req.amount) {
            return Err(CourierpayError::InsufficientFunds {
                needed: req.amount,
                available: payer_account.balance,
            });
        }
        let credit = self.ledger.primary_account_of(actor.user_id).ok_or_else(|| {
            CourierpayError::validation("you hold no account to receive into")
        })?;
        require_location(req.sender_location, "sender")?;
        require_location(req.recipient_location, "recipient")?;

        plan.user = payer.id;
        plan.recipient = Some(actor.user_id);
        plan.credit_account = Some(credit.id);
        Ok(())
    }

    fn plan_own(&self, plan: &mut TransferPlan, req: &TransferRequest, actor: &Actor) -> Result<()> {
        let target_id = req.target_account.ok_or_else(|| {
            CourierpayError::validation(format!("{} requires a target account", plan.kind))
        })?;
        let target = self.ledger.account(target_id)?;
        if !target.is_owned_by(actor.user_id) {
            return Err(CourierpayError::unauthorized(format!(
                "{} does not belong to {}",
                target.id, actor.user_id
            )));
        }
        let shapes_match = match plan.kind {
            TransactionType::CardToWallet => plan.source.kind.is_card() && target.kind.is_wallet(),
            TransactionType::WalletToCard => plan.source.kind.is_wallet() && target.kind.is_card(),
            _ => false,
        };
        if !shapes_match {
            let (from, to) = if plan.kind == TransactionType::CardToWallet {
                ("card", "wallet")
            } else {
                ("wallet", "card")
            };
            return Err(CourierpayError::validation(format!(
                "{} needs a {from} source and a {to} target",
                plan.kind
            )));
        }
        plan.credit_account = Some(target.id);
        Ok(())
    }

    fn plan_currency(&self, plan: &mut TransferPlan, target: AccountId, convert: bool) -> Result<()> {
        let credited = self.ledger.account(target)?;
        if credited.currency != plan.currency_to {
            return Err(CourierpayError::validation(format!(
                "credited account {} holds {}, not {}",
                credited.id, credited.currency, plan.currency_to
            )));
        }
        if plan.currency_from != plan.currency_to {
            if !convert {
                return Err(CourierpayError::validation(format!(
                    "{} -> {} requires conversion",
                    plan.currency_from, plan.currency_to
                )));
            }
            plan.needs_quote = true;
        }
        Ok(())
    }

    // =================================================================
    // Courier selection
    // =================================================================

    /// Closest verified courier to `target`, if any. Couriers that are not
    /// in the directory, or not verified, are never picked.
    #[must_use]
    pub fn nearest_courier(&self, target: Option<Coordinates>) -> Option<NearestAgent> {
        let target = target?;
        let eligibility = self.directory.courier_eligibility();
        let candidates = self.agents.snapshot().into_iter().map(|loc| Candidate {
            agent: loc.agent,
            position: loc.position,
            eligible: eligibility.get(&loc.agent).copied().unwrap_or(false),
        });
        nearest_eligible_agent(Some(target), candidates)
    }

    // =================================================================
    // Execution
    // =================================================================

    fn commit(
        &self,
        plan: &TransferPlan,
        quote: Option<&Quote>,
        agent: Option<AgentRef>,
    ) -> Result<Transaction> {
        let mut accounts = vec![plan.source.id];
        accounts.extend(plan.credit_account);

        let tx = self.ledger.atomically(&accounts, |unit| {
            unit.debit(plan.source.id, plan.amount)?;

            let (credited, fee) = match (plan.credit_account, quote) {
                // Peer transfers pay the fee in the credited currency, after
                // any conversion.
                (Some(target), quote) if plan.kind.is_peer_transfer() => {
                    let (gross, currency) = match quote {
                        Some(q) => {
                            unit.declare_conversion(&q.from, q.amount, &q.to, q.converted)?;
                            (q.converted, &q.to)
                        }
                        None => (plan.amount, &plan.currency_from),
                    };
                    let net = net_of_fee(gross, self.fee_rate)?;
                    let fee = gross - net;
                    if net > Decimal::ZERO {
                        unit.credit(target, net)?;
                    }
                    unit.declare_fee(currency, fee)?;
                    (Some(net), fee)
                }
                (Some(target), Some(q)) => {
                    unit.credit(target, q.converted)?;
                    unit.declare_conversion(&q.from, q.amount, &q.to, q.converted)?;
                    (Some(q.converted), Decimal::ZERO)
                }
                (Some(target), None) => {
                    unit.credit(target, plan.amount)?;
                    (Some(plan.amount), Decimal::ZERO)
                }
                (None, _) => {
                    unit.declare_cash_out(&plan.currency_from, plan.amount)?;
                    (None, Decimal::ZERO)
                }
            };

            let status = if plan.kind.settles_immediately() {
                TransactionStatus::Completed
            } else {
                TransactionStatus::Pending
            };
            let delivery_status = if agent.is_some() {
                DeliveryStatus::Assigned
            } else {
                DeliveryStatus::Pending
            };
            let tx = Transaction {
                id: TransactionId::new(),
                transaction_type: plan.kind,
                user: plan.user,
                source_account: plan.source.id,
                recipient: plan.recipient,
                credit_account: plan.credit_account,
                amount: plan.amount,
                currency_from: plan.currency_from.clone(),
                currency_to: plan.currency_to.clone(),
                converted_amount: quote.map(|q| q.converted),
                rate: quote.map(|q| q.rate),
                credited_amount: credited,
                fee,
                sender_location: plan.sender_location,
                recipient_location: plan.recipient_location,
                note: plan.note.clone(),
                delivery_agent: agent,
                status,
                delivery_status,
                created_at: Utc::now(),
            };
            unit.insert_transaction(tx.clone())?;
            Ok(tx)
        })?;

        tracing::info!(
            tx = %tx.id,
            kind = %tx.transaction_type,
            user = %tx.user,
            amount = %tx.amount,
            currency = %tx.currency_from,
            credited = ?tx.credited_amount,
            fee = %tx.fee,
            agent = ?tx.delivery_agent,
            status = %tx.status,
            "Transfer committed"
        );
        Ok(tx)
    }
}
