//! # courierpay-types
//!
//! Shared types, errors, and configuration for **CourierPay**.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`AccountId`], [`TransactionId`], [`SignatureId`]
//! - **Identity**: [`Role`], [`VerificationStatus`], [`User`], [`Actor`]
//! - **Accounts**: [`Account`], [`AccountKind`]
//! - **Transactions**: [`Transaction`], [`TransactionType`], [`TransactionStatus`], [`DeliveryStatus`]
//! - **Locations**: [`Coordinates`], [`AgentLocation`]
//! - **Signatures**: [`DigitalSignature`]
//! - **Money**: [`round_money`], [`CurrencyCode`]
//! - **Configuration**: [`ServiceConfig`], [`RateOracleConfig`], [`RegistrationConfig`], [`LogConfig`]
//! - **Errors**: [`CourierpayError`] with `CP_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod account;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ids;
pub mod location;
pub mod money;
pub mod signature;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use courierpay_types::{Account, Transaction, DeliveryStatus, ...};

pub use account::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use ids::*;
pub use location::*;
pub use money::*;
pub use signature::*;
pub use transaction::*;

// Constants are accessed via `courierpay_types::constants::FOO`
// (not re-exported to avoid name collisions).
