//! The `CourierPay` service: one handle over the ledger, the directory, the
//! courier registry and the engines that act on them.
//!
//! Callers are authenticated elsewhere and arrive here as an [`Actor`].

use std::sync::Arc;

use courierpay_geo::{AgentRegistry, NearestAgent};
use courierpay_ledger::{LedgerStore, UserDirectory};
use courierpay_types::{
    Account, Actor, AgentLocation, Coordinates, CourierpayError, CurrencyCode, DeliveryStatus,
    DigitalSignature, Result, Role, ServiceConfig, Transaction, TransactionId, User, UserId,
    VerificationStatus,
};
use rust_decimal::Decimal;

use crate::delivery::{DeliveryDesk, SignatureInput};
use crate::engine::TransferEngine;
use crate::oracle::{HttpRateOracle, RateOracle};
use crate::registration::RegistrationDesk;
use crate::request::TransferRequest;

/// Service facade.
#[derive(Debug)]
pub struct CourierPay {
    config: ServiceConfig,
    ledger: Arc<LedgerStore>,
    directory: Arc<UserDirectory>,
    agents: Arc<AgentRegistry>,
    engine: TransferEngine,
    deliveries: DeliveryDesk,
    registrations: RegistrationDesk,
}

impl CourierPay {
    /// Build a service with fresh in-memory state.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: ServiceConfig, oracle: Arc<dyn RateOracle>) -> Result<Self> {
        config.validate()?;
        let ledger = Arc::new(LedgerStore::new());
        let directory = Arc::new(UserDirectory::new());
        let agents = Arc::new(AgentRegistry::new());
        let engine = TransferEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&directory),
            Arc::clone(&agents),
            Arc::clone(&oracle),
            config.fee_rate,
        );
        let deliveries = DeliveryDesk::new(Arc::clone(&ledger));
        let registrations = RegistrationDesk::new(&config.registration)?;

        tracing::info!(
            service = courierpay_types::constants::SERVICE_NAME,
            version = courierpay_types::constants::VERSION,
            fee_rate = %config.fee_rate,
            oracle = oracle.name(),
            "Service initialized"
        );
        Ok(Self {
            config,
            ledger,
            directory,
            agents,
            engine,
            deliveries,
            registrations,
        })
    }

    /// Build a service that prices conversions over HTTP.
    ///
    /// # Errors
    /// Returns `Configuration` for a bad config or HTTP client.
    pub fn with_http_oracle(config: ServiceConfig) -> Result<Self> {
        let oracle = HttpRateOracle::new(&config.rate_oracle)?;
        Self::new(config, Arc::new(oracle))
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    #[must_use]
    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    // =================================================================
    // Transfers
    // =================================================================

    /// Validate and execute a money movement.
    ///
    /// # Errors
    /// See [`TransferEngine::execute`].
    pub async fn create_transfer(
        &self,
        request: &TransferRequest,
        actor: &Actor,
    ) -> Result<Transaction> {
        self.engine.execute(request, actor).await
    }

    /// What `actor` may list: couriers see every delivery still waiting
    /// for a courier, everyone else sees the transactions they are party to.
    #[must_use]
    pub fn transactions_for(&self, actor: &Actor) -> Vec<Transaction> {
        match actor.role {
            Role::Delivery => self.ledger.transactions_where(Transaction::awaits_courier),
            Role::User | Role::Admin => self.ledger.transactions_of(actor.user_id),
        }
    }

    /// One transaction, if `actor` is a party to it, its courier, or an admin.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `Authorization` for an outsider.
    pub fn transaction(&self, id: TransactionId, actor: &Actor) -> Result<Transaction> {
        let tx = self.ledger.transaction(id)?;
        let visible = actor.role.can_administer()
            || tx.involves(actor.user_id)
            || tx.delivery_agent == Some(actor.user_id);
        if !visible {
            return Err(CourierpayError::unauthorized(format!(
                "{} may not view {id}",
                actor.user_id
            )));
        }
        Ok(tx)
    }

    // =================================================================
    // Delivery
    // =================================================================

    /// # Errors
    /// See [`DeliveryDesk::claim`].
    pub fn claim_delivery(&self, tx: TransactionId, actor: &Actor) -> Result<()> {
        self.deliveries.claim(tx, actor)
    }

    /// # Errors
    /// See [`DeliveryDesk::advance`].
    pub fn advance_delivery(
        &self,
        tx: TransactionId,
        actor: &Actor,
        new_status: DeliveryStatus,
        signature: Option<SignatureInput>,
    ) -> Result<()> {
        self.deliveries.advance(tx, actor, new_status, signature)
    }

    /// # Errors
    /// See [`DeliveryDesk::record_signature`].
    pub fn record_signature(
        &self,
        tx: TransactionId,
        actor: &Actor,
        payload: &str,
    ) -> Result<DigitalSignature> {
        self.deliveries.record_signature(tx, actor, payload)
    }

    /// # Errors
    /// See [`DeliveryDesk::fail`].
    pub fn fail_transaction(&self, tx: TransactionId, actor: &Actor) -> Result<()> {
        self.deliveries.fail(tx, actor)
    }

    // =================================================================
    // Couriers
    // =================================================================

    /// Record where a courier is.
    ///
    /// # Errors
    /// `Authorization` unless the actor is a courier, `Validation` for
    /// out-of-range coordinates.
    pub fn report_agent_location(
        &self,
        actor: &Actor,
        latitude: f64,
        longitude: f64,
    ) -> Result<AgentLocation> {
        if !actor.role.can_deliver() {
            return Err(CourierpayError::unauthorized(format!(
                "role {} does not report locations",
                actor.role
            )));
        }
        let position = Coordinates::new(latitude, longitude)?;
        self.agents.upsert(actor.user_id, position)
    }

    /// The closest verified courier to a point. `None` for an invalid point
    /// or when no courier qualifies.
    #[must_use]
    pub fn nearest_agent(&self, latitude: f64, longitude: f64) -> Option<NearestAgent> {
        self.engine
            .nearest_courier(Coordinates::new(latitude, longitude).ok())
    }

    // =================================================================
    // Accounts
    // =================================================================

    /// Register a card for the caller.
    ///
    /// # Errors
    /// `Validation` for a bad suffix, currency or opening balance.
    pub fn open_card(
        &self,
        actor: &Actor,
        last_four: &str,
        cardholder_name: &str,
        currency: &str,
        opening_balance: Decimal,
    ) -> Result<Account> {
        let currency = CurrencyCode::parse(currency)?;
        self.ledger
            .open_card(actor.user_id, last_four, cardholder_name, currency, opening_balance)
    }

    /// Open the caller's wallet.
    ///
    /// # Errors
    /// `Conflict` if the caller already holds one, `Validation` for bad input.
    pub fn open_wallet(
        &self,
        actor: &Actor,
        currency: &str,
        opening_balance: Decimal,
    ) -> Result<Account> {
        let currency = CurrencyCode::parse(currency)?;
        self.ledger.open_wallet(actor.user_id, currency, opening_balance)
    }

    #[must_use]
    pub fn accounts_of(&self, actor: &Actor) -> Vec<Account> {
        self.ledger.accounts_of(actor.user_id)
    }

    // =================================================================
    // Users
    // =================================================================

    /// Start a self-registration; the returned passcode goes to the
    /// applicant by e-mail.
    ///
    /// # Errors
    /// See [`RegistrationDesk::stage`].
    pub fn stage_registration(&self, email: &str, role: Role) -> Result<String> {
        self.registrations.stage(&self.directory, email, role)
    }

    /// Finish a self-registration. The new user starts `pending`.
    ///
    /// # Errors
    /// See [`RegistrationDesk::confirm`].
    pub fn confirm_registration(&self, email: &str, otp: &str) -> Result<UserId> {
        self.registrations
            .confirm(&self.directory, email, otp)
            .map(|user| user.id)
    }

    /// Back-office: approve, block or reset a user.
    ///
    /// # Errors
    /// `Authorization` unless `admin` is an admin, `NotFound` for an unknown
    /// user.
    pub fn set_user_status(
        &self,
        admin: &Actor,
        user: UserId,
        status: VerificationStatus,
    ) -> Result<User> {
        admin.ensure_admin()?;
        self.directory.set_status(user, status)
    }

    /// Back-office: users in one verification state, oldest first.
    ///
    /// # Errors
    /// `Authorization` unless `admin` is an admin.
    pub fn users_with_status(
        &self,
        admin: &Actor,
        status: VerificationStatus,
    ) -> Result<Vec<User>> {
        admin.ensure_admin()?;
        Ok(self.directory.with_status(status))
    }

    /// Drop expired pending registrations.
    pub fn purge_expired_registrations(&self) -> usize {
        self.registrations.purge_expired()
    }
}
