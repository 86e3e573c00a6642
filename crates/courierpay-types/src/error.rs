//! Error types for CourierPay.
//!
//! All errors use the `CP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation errors (bad or missing input)
//! - 2xx: Funds errors
//! - 3xx: Lookup errors
//! - 4xx: Currency conversion errors
//! - 5xx: State conflicts (delivery state machine, double claims)
//! - 6xx: Authorization errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Central error enum for all CourierPay operations.
#[derive(Debug, Error)]
pub enum CourierpayError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The request failed validation (missing fields, bad values, etc.).
    #[error("CP_ERR_100: Validation failed: {reason}")]
    Validation { reason: String },

    // =================================================================
    // Funds Errors (2xx)
    // =================================================================
    /// Not enough balance on the debited account.
    #[error("CP_ERR_200: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    // =================================================================
    // Lookup Errors (3xx)
    // =================================================================
    /// A referenced account, user, or transaction does not exist.
    #[error("CP_ERR_300: Not found: {what}")]
    NotFound { what: String },

    // =================================================================
    // Conversion Errors (4xx)
    // =================================================================
    /// The rate oracle produced no usable rate.
    #[error("CP_ERR_400: Conversion unavailable: {from} -> {to}")]
    ConversionUnavailable { from: String, to: String },

    // =================================================================
    // State Conflicts (5xx)
    // =================================================================
    /// A transition was attempted from the wrong state, or lost a race.
    #[error("CP_ERR_500: Conflict: {reason}")]
    Conflict { reason: String },

    // =================================================================
    // Authorization Errors (6xx)
    // =================================================================
    /// The actor is not entitled to perform the action.
    #[error("CP_ERR_600: Not authorized: {reason}")]
    Authorization { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error (broken invariant, arithmetic overflow).
    #[error("CP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("CP_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl CourierpayError {
    /// Shorthand for a [`CourierpayError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CourierpayError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for a [`CourierpayError::Conflict`].
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CourierpayError::Authorization`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Only conversion failures are transient; they are raised before any
    /// balance is touched.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConversionUnavailable { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CourierpayError>;

impl From<serde_json::Error> for CourierpayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
