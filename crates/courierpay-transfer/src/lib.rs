//! # courierpay-transfer
//!
//! **Transfer plane**: everything that moves money or moves a delivery.
//!
//! ## Components
//!
//! 1. **RateOracle**: exchange rates over HTTP (or a static table); any
//!    failure is "no rate"
//! 2. **TransferEngine**: ordered validation, conversion pre-step, courier
//!    selection, and one atomic ledger unit per transfer
//! 3. **DeliveryDesk**: claim / advance / sign / fail, each a conditional
//!    update on the transaction record
//! 4. **RegistrationDesk**: OTP-confirmed self-registration held in a
//!    [`TtlStore`]
//! 5. **CourierPay**: the service facade over all of the above
//!
//! ## Flow
//!
//! ```text
//! TransferRequest ──▶ TransferEngine ──▶ RateOracle (if converting)
//!                          │        └──▶ AgentRegistry (nearest courier)
//!                          ▼
//!                   LedgerStore::atomically ──▶ Transaction (pending/assigned)
//!                                                     │
//!          claim ─▶ assigned ─▶ in_transit ─▶ delivered + signature ─▶ completed
//! ```
//!
//! The oracle call is the only await point and no lock is held across it.

pub mod conversion;
pub mod delivery;
pub mod engine;
pub mod oracle;
pub mod registration;
pub mod request;
pub mod service;
pub mod telemetry;
pub mod ttl_store;

pub use conversion::{ConversionStep, Quote};
pub use delivery::{DeliveryDesk, SignatureInput};
pub use engine::TransferEngine;
pub use oracle::{HttpRateOracle, RateOracle, StaticRateOracle};
pub use registration::{PendingRegistration, RegistrationDesk};
pub use request::TransferRequest;
pub use service::CourierPay;
pub use telemetry::init_tracing;
pub use ttl_store::TtlStore;
